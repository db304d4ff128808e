//! Template store: source of truth for what binary and what data shape a
//! document type expects.
//!
//! Blob writes and deletes are side effects outside the database transaction
//! boundary. There is deliberately no two-phase commit between the bucket
//! and the record; a failed blob delete is logged and the primary CRUD
//! operation still succeeds, accepting a transient orphaned blob.

use crate::db::Repository;
use crate::error::DocumentError;
use crate::storage::ObjectStorage;
use crate::template::models::Template;
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct TemplateStore {
    repo: Arc<dyn Repository + Send + Sync>,
    storage: Arc<dyn ObjectStorage + Send + Sync>,
}

impl TemplateStore {
    pub fn new(
        repo: Arc<dyn Repository + Send + Sync>,
        storage: Arc<dyn ObjectStorage + Send + Sync>,
    ) -> Self {
        TemplateStore { repo, storage }
    }

    /// Inserts a new template when `id` is absent, updates the existing one
    /// otherwise. On update the stored category is kept (category is
    /// immutable after creation) and, when the blob key changed, the
    /// previous blob is deleted best-effort.
    ///
    /// Fails with `NotFound` when `id` is supplied but no such template
    /// exists.
    pub async fn create_or_update(
        &self,
        id: Option<Uuid>,
        name: String,
        category: String,
        blob_key: Option<String>,
        placeholders: Option<Vec<String>>,
    ) -> Result<Template, DocumentError> {
        match id {
            None => {
                let mut template = Template::new(name, category, blob_key);
                template.placeholders = placeholders;
                self.repo.insert_template(&template).await?;
                log::info!("Template '{}' created with id {}", template.name, template.id);
                Ok(template)
            }
            Some(id) => {
                let mut template = self
                    .repo
                    .get_template(&id)
                    .await?
                    .ok_or_else(|| DocumentError::NotFound(format!("template {}", id)))?;

                let previous_blob = template.blob_key.clone();

                template.name = name;
                if let Some(new_key) = blob_key {
                    template.blob_key = Some(new_key);
                }
                if placeholders.is_some() {
                    template.placeholders = placeholders;
                }
                template.updated_at = Utc::now();

                self.repo.update_template(&template).await?;

                // Old binary becomes unreachable once the record points at
                // the new key; failure to delete it only leaves an orphan.
                if let Some(old_key) = previous_blob {
                    if template.blob_key.as_deref() != Some(old_key.as_str()) {
                        if let Err(e) = self.storage.delete_file(&old_key).await {
                            log::warn!(
                                "Failed to delete replaced template blob '{}': {}",
                                old_key,
                                e
                            );
                        }
                    }
                }

                log::info!("Template {} updated", template.id);
                Ok(template)
            }
        }
    }

    /// Never errors for a missing id.
    pub async fn get(&self, id: &Uuid) -> Result<Option<Template>, DocumentError> {
        self.repo.get_template(id).await
    }

    /// Deletes the blob first (best-effort, so the UI never points at a
    /// vanished record), then the record. Returns `false` without erroring
    /// when the template does not exist.
    pub async fn delete(&self, id: &Uuid) -> Result<bool, DocumentError> {
        let template = match self.repo.get_template(id).await? {
            Some(t) => t,
            None => return Ok(false),
        };

        if let Some(blob_key) = &template.blob_key {
            if let Err(e) = self.storage.delete_file(blob_key).await {
                log::warn!("Failed to delete template blob '{}': {}", blob_key, e);
            }
        }

        let deleted = self.repo.delete_template(id).await?;
        if deleted {
            log::info!("Template {} deleted", id);
        }
        Ok(deleted)
    }

    /// Most-recently-updated first.
    pub async fn list(&self) -> Result<Vec<Template>, DocumentError> {
        self.repo.list_templates().await
    }
}
