use crate::config::ClassificationConfig;
use providers::{CompletionRequest, ImageInput, LlmProvider, ProviderError, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const IMAGE_PROMPT: &str = "Select the one main furniture in the picture and tell: type, color, material. For example `Bed, White, Wood`";

pub fn query_prompt(query: &str) -> String {
    format!(
        "Filter this query to determine the furniture type, color, and material: {query}. \
         Return exactly the type, color, and material, separated by comma. \
         If any attribute doesn't exist, just write None."
    )
}

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classification service failed: {0}")]
    Service(#[from] ProviderError),
    #[error("classification service did not answer within {0:?}")]
    Timeout(Duration),
}

impl ClassifyError {
    /// Timeouts, transport errors, rate limiting and server errors may succeed
    /// on a later attempt; anything else will not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClassifyError::Timeout(_) => true,
            ClassifyError::Service(ProviderError::RequestFailed(_)) => true,
            ClassifyError::Service(ProviderError::Status { status, .. }) => {
                *status == 429 || *status >= 500
            }
            ClassifyError::Service(_) => false,
        }
    }
}

/// Narrow contract over the external image/text understanding service.
///
/// Both methods return the model's first completion verbatim; parsing is
/// left to [`crate::extractor`].
#[async_trait::async_trait]
pub trait ClassificationService: Send + Sync {
    async fn classify_image(&self, image: &[u8], mime: &str) -> Result<String, ClassifyError>;
    async fn classify_query(&self, query: &str) -> Result<String, ClassifyError>;
}

/// [`ClassificationService`] backed by an [`LlmProvider`], with a bounded
/// timeout per attempt and optional retries.
pub struct LlmClassifier {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    max_attempts: u32,
    backoff: Duration,
}

impl LlmClassifier {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            timeout: Duration::from_secs(60),
            max_attempts: 1,
            backoff: Duration::from_millis(500),
        }
    }

    pub fn from_config(
        registry: &ProviderRegistry,
        cfg: &ClassificationConfig,
    ) -> Result<Self, ProviderError> {
        let llm = registry.llm(Some(cfg.provider.as_str()))?;
        Ok(Self::new(llm)
            .with_timeout(Duration::from_secs(cfg.timeout_secs))
            .with_retries(cfg.max_attempts, Duration::from_millis(cfg.retry_backoff_ms)))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.backoff = backoff;
        self
    }

    async fn call(&self, request: CompletionRequest) -> Result<String, ClassifyError> {
        let mut attempt = 1;
        loop {
            let result = match tokio::time::timeout(self.timeout, self.llm.complete(&request)).await
            {
                Ok(Ok(text)) => {
                    debug!(attempt, response = %text, "description from model");
                    return Ok(text);
                }
                Ok(Err(e)) => ClassifyError::Service(e),
                Err(_) => ClassifyError::Timeout(self.timeout),
            };
            if attempt >= self.max_attempts || !result.is_transient() {
                return Err(result);
            }
            warn!(attempt, error = %result, "classification attempt failed, retrying");
            tokio::time::sleep(self.backoff * attempt).await;
            attempt += 1;
        }
    }
}

#[async_trait::async_trait]
impl ClassificationService for LlmClassifier {
    async fn classify_image(&self, image: &[u8], mime: &str) -> Result<String, ClassifyError> {
        let request = CompletionRequest::with_image(
            IMAGE_PROMPT,
            ImageInput {
                mime: mime.to_string(),
                data: image.to_vec(),
            },
        );
        self.call(request).await
    }

    async fn classify_query(&self, query: &str) -> Result<String, ClassifyError> {
        self.call(CompletionRequest::text(query_prompt(query))).await
    }
}
