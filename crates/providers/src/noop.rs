use crate::{CompletionRequest, LlmProvider, ProviderError};

#[derive(Debug, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl LlmProvider for NoopProvider {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        Err(ProviderError::NotImplemented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_always_fails() {
        let err = NoopProvider
            .complete(&CompletionRequest::text("anything"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotImplemented));
    }
}
