use crate::classifier::ClassifyError;
use crate::extractor;
use crate::models::SearchFilter;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search query is empty")]
    EmptyQuery,
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("catalog query failed: {0}")]
    Store(#[from] sqlx::Error),
}

/// Trimmed query text, or `EmptyQuery` when there is nothing to send.
pub fn normalize_query(query: &str) -> Result<&str, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(SearchError::EmptyQuery)
    } else {
        Ok(trimmed)
    }
}

/// Filter derived from the service's query-mode reply.
pub fn filter_from_reply(raw: &str) -> SearchFilter {
    extractor::extract_for_search(raw).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_rejected() {
        assert!(matches!(normalize_query(""), Err(SearchError::EmptyQuery)));
        assert!(matches!(normalize_query(" \t\n"), Err(SearchError::EmptyQuery)));
        assert_eq!(normalize_query("  red chair ").unwrap(), "red chair");
    }

    #[test]
    fn reply_without_attributes_is_a_full_wildcard() {
        assert!(filter_from_reply("None, None, None").is_wildcard());
        let filter = filter_from_reply("Chair, Red, None");
        assert_eq!(filter.kind.as_deref(), Some("Chair"));
        assert_eq!(filter.color.as_deref(), Some("Red"));
        assert_eq!(filter.material, None);
    }
}
