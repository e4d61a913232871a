use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `furniture` relation.
///
/// `None` attributes are stored as SQL NULL and mean "not determined".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FurnitureRecord {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub image_path: String,
}

/// Parsed (type, color, material) classification of one item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeTriple {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
}

impl AttributeTriple {
    pub fn known(
        kind: impl Into<String>,
        color: impl Into<String>,
        material: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some(kind.into()),
            color: Some(color.into()),
            material: Some(material.into()),
        }
    }
}

/// Catalog filter. A `None` field imposes no constraint; a `Some` field
/// matches records whose value contains it, ignoring ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
}

impl SearchFilter {
    pub fn is_wildcard(&self) -> bool {
        self.kind.is_none() && self.color.is_none() && self.material.is_none()
    }

    pub(crate) fn constraints(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("type", self.kind.as_deref()),
            ("color", self.color.as_deref()),
            ("material", self.material.as_deref()),
        ]
        .into_iter()
        .filter_map(|(column, value)| value.map(|v| (column, v)))
    }
}

impl From<AttributeTriple> for SearchFilter {
    fn from(triple: AttributeTriple) -> Self {
        Self {
            kind: triple.kind,
            color: triple.color,
            material: triple.material,
        }
    }
}
