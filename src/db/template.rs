//! Template persistence on Postgres.

use super::PgDatabase;
use crate::error::DocumentError;
use crate::template::models::Template;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
pub(crate) struct TemplateRow {
    id: Uuid,
    name: String,
    category: String,
    blob_key: Option<String>,
    placeholders: Option<Json<Vec<String>>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TemplateRow> for Template {
    fn from(row: TemplateRow) -> Self {
        Template {
            id: row.id,
            name: row.name,
            category: row.category,
            blob_key: row.blob_key,
            placeholders: row.placeholders.map(|p| p.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const TEMPLATE_COLUMNS: &str =
    "id, name, category, blob_key, placeholders, created_at, updated_at";

impl PgDatabase {
    pub(crate) async fn pg_insert_template(
        &self,
        template: &Template,
    ) -> Result<(), DocumentError> {
        sqlx::query(
            r#"
            INSERT INTO templates (id, name, category, blob_key, placeholders, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(&template.category)
        .bind(template.blob_key.as_deref())
        .bind(template.placeholders.clone().map(Json))
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn pg_update_template(
        &self,
        template: &Template,
    ) -> Result<(), DocumentError> {
        sqlx::query(
            r#"
            UPDATE templates
            SET name = $2, blob_key = $3, placeholders = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(template.id)
        .bind(&template.name)
        .bind(template.blob_key.as_deref())
        .bind(template.placeholders.clone().map(Json))
        .bind(template.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub(crate) async fn pg_get_template(
        &self,
        id: &Uuid,
    ) -> Result<Option<Template>, DocumentError> {
        let row = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE id = $1",
            TEMPLATE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Template::from))
    }

    pub(crate) async fn pg_delete_template(&self, id: &Uuid) -> Result<bool, DocumentError> {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn pg_list_templates(&self) -> Result<Vec<Template>, DocumentError> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates ORDER BY updated_at DESC",
            TEMPLATE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Template::from).collect())
    }

    pub(crate) async fn pg_list_templates_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Template>, DocumentError> {
        let rows = sqlx::query_as::<_, TemplateRow>(&format!(
            "SELECT {} FROM templates WHERE category = $1 ORDER BY updated_at DESC",
            TEMPLATE_COLUMNS
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Template::from).collect())
    }
}
