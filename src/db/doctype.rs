//! Document-type configuration persistence and category lookup on Postgres.

use super::{PgDatabase, DOCUMENT_TYPE_CACHE_KEY};
use crate::doctype::lookup::{CategoryClass, CategoryLookup, PROPOSAL_CATEGORY};
use crate::doctype::models::DocumentType;
use crate::error::DocumentError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct DocumentTypeRow {
    id: Uuid,
    name: String,
    is_financial: bool,
    created_at: DateTime<Utc>,
}

impl From<DocumentTypeRow> for DocumentType {
    fn from(row: DocumentTypeRow) -> Self {
        DocumentType {
            id: row.id,
            name: row.name,
            is_financial: row.is_financial,
            created_at: row.created_at,
        }
    }
}

impl PgDatabase {
    pub(crate) async fn pg_list_document_types(
        &self,
    ) -> Result<Vec<DocumentType>, DocumentError> {
        if let Some(cached) = self.type_cache.get(DOCUMENT_TYPE_CACHE_KEY).await {
            return Ok(cached);
        }

        let rows = sqlx::query_as::<_, DocumentTypeRow>(
            "SELECT id, name, is_financial, created_at FROM document_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let types: Vec<DocumentType> = rows.into_iter().map(DocumentType::from).collect();
        self.type_cache
            .insert(DOCUMENT_TYPE_CACHE_KEY.to_string(), types.clone())
            .await;

        Ok(types)
    }

    pub(crate) async fn pg_get_document_type(
        &self,
        name: &str,
    ) -> Result<Option<DocumentType>, DocumentError> {
        let row = sqlx::query_as::<_, DocumentTypeRow>(
            "SELECT id, name, is_financial, created_at FROM document_types WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(DocumentType::from))
    }

    pub(crate) async fn pg_insert_document_type(
        &self,
        doc_type: &DocumentType,
    ) -> Result<(), DocumentError> {
        sqlx::query(
            "INSERT INTO document_types (id, name, is_financial, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(doc_type.id)
        .bind(&doc_type.name)
        .bind(doc_type.is_financial)
        .bind(doc_type.created_at)
        .execute(&self.pool)
        .await?;

        self.type_cache.invalidate(DOCUMENT_TYPE_CACHE_KEY).await;
        Ok(())
    }

    pub(crate) async fn pg_delete_document_type(
        &self,
        name: &str,
    ) -> Result<bool, DocumentError> {
        let result = sqlx::query("DELETE FROM document_types WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;

        self.type_cache.invalidate(DOCUMENT_TYPE_CACHE_KEY).await;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CategoryLookup for PgDatabase {
    async fn classify(&self, name: &str) -> Result<Option<CategoryClass>, DocumentError> {
        if name == PROPOSAL_CATEGORY {
            return Ok(Some(CategoryClass::NonFinancial));
        }

        let types = self.pg_list_document_types().await?;
        Ok(types.iter().find(|t| t.name == name).map(|t| {
            if t.is_financial {
                CategoryClass::Financial
            } else {
                CategoryClass::NonFinancial
            }
        }))
    }
}
