use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Review state of a financial document. Assigned `Pending` at creation and
/// changed only by an explicit review action.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, ToSchema)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(ApprovalStatus::Pending),
            "Approved" => Some(ApprovalStatus::Approved),
            "Rejected" => Some(ApprovalStatus::Rejected),
            _ => None,
        }
    }
}

/// Approval overlay carried only by financial documents. Last write wins;
/// no history of prior reviews is kept.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct ApprovalState {
    pub status: ApprovalStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ApprovalState {
    pub fn pending() -> Self {
        ApprovalState {
            status: ApprovalStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
        }
    }
}

/// Financial-ness of a document, resolved at generation time from the
/// document-type configuration.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentKind {
    Standard,
    Financial { approval: ApprovalState },
}

impl DocumentKind {
    pub fn is_financial(&self) -> bool {
        matches!(self, DocumentKind::Financial { .. })
    }
}

/// A rendered document: client snapshot, both artifact URLs, the template it
/// came from and a serialized copy of the input form data.
///
/// `version` is an optimistic counter; regenerations of the same record must
/// present the version they read or the upsert is rejected.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct DocumentRecord {
    pub id: Uuid,
    #[schema(example = "Acme Rooftop Pte Ltd")]
    pub client_name: String,
    #[schema(example = "Purchase Order")]
    pub document_type: String,
    pub pdf_url: String,
    pub docx_url: String,
    pub template_id: Option<Uuid>,
    pub form_data: serde_json::Value,
    #[serde(flatten)]
    pub kind: DocumentKind,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateDocumentRequest {
    #[serde(rename = "templateId")]
    pub template_id: Uuid,
    #[serde(rename = "formData")]
    #[schema(value_type = Object)]
    pub form_data: serde_json::Map<String, serde_json::Value>,
    #[serde(rename = "documentType")]
    #[schema(example = "Purchase Order")]
    pub document_type: String,
    #[serde(rename = "documentIdToUpdate")]
    pub document_id_to_update: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateDocumentResponse {
    pub success: bool,
    #[serde(rename = "pdfUrl")]
    pub pdf_url: String,
    #[serde(rename = "docxUrl")]
    pub docx_url: String,
    #[serde(rename = "documentId")]
    pub document_id: Uuid,
    #[serde(rename = "isFinancialDocument")]
    pub is_financial_document: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(example = "Approved")]
    pub status: String,
    #[schema(example = "admin@solardocs.io")]
    pub reviewer: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approval_status_round_trips_through_strings() {
        for status in [
            ApprovalStatus::Pending,
            ApprovalStatus::Approved,
            ApprovalStatus::Rejected,
        ] {
            assert_eq!(ApprovalStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ApprovalStatus::parse("Signed"), None);
    }

    #[test]
    fn standard_kind_is_not_financial() {
        assert!(!DocumentKind::Standard.is_financial());
        assert!(DocumentKind::Financial {
            approval: ApprovalState::pending()
        }
        .is_financial());
    }
}
