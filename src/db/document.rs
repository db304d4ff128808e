//! Document persistence on Postgres.
//!
//! One table holds both standard and financial documents as a tagged row
//! (`kind` column); the approval columns are only meaningful when
//! `kind = 'financial'`.

use super::PgDatabase;
use crate::document::models::{ApprovalState, ApprovalStatus, DocumentKind, DocumentRecord};
use crate::error::DocumentError;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

const KIND_STANDARD: &str = "standard";
const KIND_FINANCIAL: &str = "financial";

#[derive(sqlx::FromRow)]
pub(crate) struct DocumentRow {
    id: Uuid,
    client_name: String,
    document_type: String,
    pdf_url: String,
    docx_url: String,
    template_id: Option<Uuid>,
    form_data: Json<serde_json::Value>,
    kind: String,
    status: Option<String>,
    reviewed_by: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for DocumentRecord {
    fn from(row: DocumentRow) -> Self {
        let kind = if row.kind == KIND_FINANCIAL {
            let status = row
                .status
                .as_deref()
                .and_then(ApprovalStatus::parse)
                .unwrap_or(ApprovalStatus::Pending);
            DocumentKind::Financial {
                approval: ApprovalState {
                    status,
                    reviewed_by: row.reviewed_by,
                    reviewed_at: row.reviewed_at,
                },
            }
        } else {
            DocumentKind::Standard
        };

        DocumentRecord {
            id: row.id,
            client_name: row.client_name,
            document_type: row.document_type,
            pdf_url: row.pdf_url,
            docx_url: row.docx_url,
            template_id: row.template_id,
            form_data: row.form_data.0,
            kind,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn kind_columns(record: &DocumentRecord) -> (&'static str, Option<&str>, Option<&str>, Option<DateTime<Utc>>) {
    match &record.kind {
        DocumentKind::Standard => (KIND_STANDARD, None, None, None),
        DocumentKind::Financial { approval } => (
            KIND_FINANCIAL,
            Some(approval.status.as_str()),
            approval.reviewed_by.as_deref(),
            approval.reviewed_at,
        ),
    }
}

const DOCUMENT_COLUMNS: &str = "id, client_name, document_type, pdf_url, docx_url, template_id, \
     form_data, kind, status, reviewed_by, reviewed_at, version, created_at, updated_at";

impl PgDatabase {
    pub(crate) async fn pg_get_document(
        &self,
        id: &Uuid,
    ) -> Result<Option<DocumentRecord>, DocumentError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE id = $1",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRecord::from))
    }

    pub(crate) async fn pg_list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents ORDER BY updated_at DESC",
            DOCUMENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRecord::from).collect())
    }

    pub(crate) async fn pg_list_documents_by_type(
        &self,
        document_type: &str,
    ) -> Result<Vec<DocumentRecord>, DocumentError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {} FROM documents WHERE document_type = $1 ORDER BY updated_at DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(document_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(DocumentRecord::from).collect())
    }

    pub(crate) async fn pg_insert_document(
        &self,
        record: &DocumentRecord,
    ) -> Result<(), DocumentError> {
        let (kind, status, reviewed_by, reviewed_at) = kind_columns(record);

        sqlx::query(
            r#"
            INSERT INTO documents
                (id, client_name, document_type, pdf_url, docx_url, template_id,
                 form_data, kind, status, reviewed_by, reviewed_at, version,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(record.id)
        .bind(&record.client_name)
        .bind(&record.document_type)
        .bind(&record.pdf_url)
        .bind(&record.docx_url)
        .bind(record.template_id)
        .bind(Json(record.form_data.clone()))
        .bind(kind)
        .bind(status)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn pg_update_document(
        &self,
        record: &DocumentRecord,
        expected_version: i64,
    ) -> Result<bool, DocumentError> {
        let (kind, status, reviewed_by, reviewed_at) = kind_columns(record);

        // The version guard rejects a regeneration that read a stale record.
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET client_name = $2, document_type = $3, pdf_url = $4, docx_url = $5,
                template_id = $6, form_data = $7, kind = $8, status = $9,
                reviewed_by = $10, reviewed_at = $11, version = $12, updated_at = $13
            WHERE id = $1 AND version = $14
            "#,
        )
        .bind(record.id)
        .bind(&record.client_name)
        .bind(&record.document_type)
        .bind(&record.pdf_url)
        .bind(&record.docx_url)
        .bind(record.template_id)
        .bind(Json(record.form_data.clone()))
        .bind(kind)
        .bind(status)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(record.version)
        .bind(record.updated_at)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn pg_delete_document(&self, id: &Uuid) -> Result<bool, DocumentError> {
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn pg_review_document(
        &self,
        id: &Uuid,
        status: ApprovalStatus,
        reviewer: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<DocumentRecord>, DocumentError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            UPDATE documents
            SET status = $2, reviewed_by = $3, reviewed_at = $4, updated_at = $4
            WHERE id = $1 AND kind = 'financial'
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(reviewer)
        .bind(reviewed_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentRecord::from))
    }
}
