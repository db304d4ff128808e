use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A named, categorized document shell with substitutable tokens.
///
/// `category` is fixed at creation time; the update path rejects attempts to
/// change it. `blob_key` points at the currently uploaded binary in object
/// storage and is replaced (old blob deleted best-effort) on re-upload.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Template {
    #[schema(example = "f1e2d3c4-b5a6-7890-1234-567890abcdef")]
    pub id: Uuid,
    #[schema(example = "Residential Proposal v2")]
    pub name: String,
    #[schema(example = "Proposal")]
    pub category: String,
    pub blob_key: Option<String>,
    /// Substitution tokens discovered by the extractor, if any.
    pub placeholders: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn new(name: String, category: String, blob_key: Option<String>) -> Self {
        let now = Utc::now();
        Template {
            id: Uuid::new_v4(),
            name,
            category,
            blob_key,
            placeholders: None,
            created_at: now,
            updated_at: now,
        }
    }
}
