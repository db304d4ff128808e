use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A dynamically configured document category. Templates and generated
/// documents reference it by name string equality only; there is no foreign
/// key between the tables.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct DocumentType {
    pub id: Uuid,
    #[schema(example = "Net Metering Agreement")]
    pub name: String,
    /// Financial types get the approval overlay on their generated
    /// documents.
    pub is_financial: bool,
    pub created_at: DateTime<Utc>,
}

impl DocumentType {
    pub fn new(name: String, is_financial: bool) -> Self {
        DocumentType {
            id: Uuid::new_v4(),
            name,
            is_financial,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocumentTypeRequest {
    #[schema(example = "Net Metering Agreement")]
    pub name: String,
    pub is_financial: bool,
}
