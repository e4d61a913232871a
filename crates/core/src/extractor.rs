//! Turns the classification service's comma-separated reply into an
//! [`AttributeTriple`].
//!
//! Two parsers exist. Ingestion is strict: anything but three non-empty
//! fields is rejected so nothing half-parsed reaches the catalog. Search is
//! lenient: unparseable positions become wildcards instead of blocking the
//! query.

use crate::models::AttributeTriple;
use thiserror::Error;

/// Token the service emits for "attribute not present" in query mode.
pub const NONE_TOKEN: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("expected 3 comma-separated fields, got {found} in {raw:?}")]
    FieldCount { found: usize, raw: String },
    #[error("field {position} is empty in {raw:?}")]
    EmptyField { position: usize, raw: String },
}

fn split_fields(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).collect()
}

/// Strict parser used when storing a new image.
pub fn extract_for_ingestion(raw: &str) -> Result<AttributeTriple, ExtractionError> {
    let fields = split_fields(raw);
    let [kind, color, material] = fields.as_slice() else {
        return Err(ExtractionError::FieldCount {
            found: if raw.trim().is_empty() { 0 } else { fields.len() },
            raw: raw.to_string(),
        });
    };
    if let Some(position) = [kind, color, material].iter().position(|f| f.is_empty()) {
        return Err(ExtractionError::EmptyField {
            position: position + 1,
            raw: raw.to_string(),
        });
    }
    Ok(AttributeTriple::known(*kind, *color, *material))
}

/// Lenient parser used for search queries.
///
/// `None` and empty fields become wildcards, missing trailing fields are
/// wildcards, and fields past the third are ignored.
pub fn extract_for_search(raw: &str) -> AttributeTriple {
    let mut fields = split_fields(raw).into_iter().map(|field| {
        if field.is_empty() || field == NONE_TOKEN {
            None
        } else {
            Some(field.to_string())
        }
    });
    AttributeTriple {
        kind: fields.next().flatten(),
        color: fields.next().flatten(),
        material: fields.next().flatten(),
    }
}
