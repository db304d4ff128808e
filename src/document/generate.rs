//! Generation orchestrator.
//!
//! Turns a (template, form data, category) triple into persisted rendered
//! artifacts, handling "create new" and "regenerate existing" uniformly:
//! fetch template blob -> render -> upload both artifacts -> upsert record.
//! Each step's output feeds the next, so ordering needs no lock. The scratch
//! file is a `NamedTempFile` and is released on every exit path.

use crate::db::Repository;
use crate::doctype::lookup::CategoryLookup;
use crate::document::models::{
    ApprovalState, DocumentKind, DocumentRecord, GenerateDocumentRequest,
};
use crate::error::DocumentError;
use crate::renderer::DocumentRenderer;
use crate::storage::ObjectStorage;
use chrono::{DateTime, Local, Utc};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Route prefix under which stored artifacts are served (by redirect to the
/// blob store). Record URLs embed the blob key after this prefix.
pub const DOCUMENT_SERVE_PREFIX: &str = "/documents/serve/";

/// What the caller needs to route the user: both artifact URLs, the record
/// id, and whether the review screen applies.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub pdf_url: String,
    pub docx_url: String,
    pub document_id: Uuid,
    pub is_financial_document: bool,
}

/// Blob deletes to run after the record upsert succeeds. Executed with
/// per-action error isolation: a failed delete is logged and the rest of the
/// list still runs.
#[derive(Default)]
struct CleanupPlan {
    stale_blobs: Vec<String>,
}

impl CleanupPlan {
    fn push(&mut self, key: String) {
        self.stale_blobs.push(key);
    }

    async fn execute(&self, storage: &(dyn ObjectStorage + Send + Sync)) {
        for key in &self.stale_blobs {
            if let Err(e) = storage.delete_file(key).await {
                log::warn!("Failed to delete stale blob '{}': {}", key, e);
            }
        }
    }
}

#[derive(Clone)]
pub struct Generator {
    repo: Arc<dyn Repository + Send + Sync>,
    storage: Arc<dyn ObjectStorage + Send + Sync>,
    renderer: Arc<dyn DocumentRenderer + Send + Sync>,
    categories: Arc<dyn CategoryLookup + Send + Sync>,
}

impl Generator {
    pub fn new(
        repo: Arc<dyn Repository + Send + Sync>,
        storage: Arc<dyn ObjectStorage + Send + Sync>,
        renderer: Arc<dyn DocumentRenderer + Send + Sync>,
        categories: Arc<dyn CategoryLookup + Send + Sync>,
    ) -> Self {
        Generator {
            repo,
            storage,
            renderer,
            categories,
        }
    }

    pub async fn generate(
        &self,
        request: GenerateDocumentRequest,
    ) -> Result<GenerationOutcome, DocumentError> {
        let template = self
            .repo
            .get_template(&request.template_id)
            .await?
            .ok_or_else(|| {
                DocumentError::TemplateUnavailable(format!(
                    "template {} not found",
                    request.template_id
                ))
            })?;

        let blob_key = template.blob_key.clone().ok_or_else(|| {
            DocumentError::TemplateUnavailable(format!(
                "template '{}' has no uploaded file",
                template.name
            ))
        })?;

        let class = self
            .categories
            .classify(&request.document_type)
            .await?
            .ok_or_else(|| DocumentError::UnknownCategory(request.document_type.clone()))?;
        let is_financial = class.is_financial();

        log::info!(
            "Generating {} document of type '{}' from template {}",
            if is_financial { "financial" } else { "standard" },
            request.document_type,
            template.id
        );

        // The template record exists but its blob may not; that is a
        // user-visible error, not retried.
        let template_bytes = self.storage.download_file(&blob_key).await.map_err(|e| {
            DocumentError::TemplateUnavailable(format!(
                "template blob '{}' unavailable: {}",
                blob_key, e
            ))
        })?;

        let mut scratch = NamedTempFile::new()
            .map_err(|e| DocumentError::storage(format!("failed to create scratch file: {}", e)))?;
        scratch
            .write_all(&template_bytes)
            .map_err(|e| DocumentError::storage(format!("failed to write scratch file: {}", e)))?;

        let data = build_data_dictionary(&request.form_data);

        let artifacts = self.renderer.render(scratch.path(), &data).await?;

        let client_name = client_name_snapshot(&request.form_data);
        let now = Utc::now();
        let prefix = storage_key_prefix(&client_name, &request.document_type, now);
        let pdf_key = format!("{}.pdf", prefix);
        let docx_key = format!("{}.docx", prefix);

        // When regenerating, the prior blobs become stale the moment the
        // record points elsewhere; collect them for the cleanup phase so
        // repeated regenerations never accumulate blobs.
        let mut cleanup = CleanupPlan::default();
        let existing = match request.document_id_to_update {
            Some(id) => {
                let prior = self.repo.get_document(&id).await?;
                match &prior {
                    Some(doc) => {
                        // Never schedule the keys we are about to write; a
                        // same-instant regeneration reuses the prefix.
                        for url in [&doc.pdf_url, &doc.docx_url] {
                            if let Some(key) = blob_key_from_url(url) {
                                if key != pdf_key && key != docx_key {
                                    cleanup.push(key.to_string());
                                }
                            }
                        }
                    }
                    None => {
                        log::warn!(
                            "Document {} no longer exists; generating a new record instead",
                            id
                        );
                    }
                }
                prior
            }
            None => None,
        };

        // Both uploads run concurrently. If one fails the other is not
        // rolled back; a rare manually-recoverable inconsistency.
        let (pdf_result, docx_result) = futures::future::join(
            self.storage.upload_file(&pdf_key, &artifacts.pdf),
            self.storage.upload_file(&docx_key, &artifacts.docx),
        )
        .await;
        pdf_result.map_err(DocumentError::storage)?;
        docx_result.map_err(DocumentError::storage)?;

        let pdf_url = format!("{}{}", DOCUMENT_SERVE_PREFIX, pdf_key);
        let docx_url = format!("{}{}", DOCUMENT_SERVE_PREFIX, docx_key);
        let form_data = serde_json::Value::Object(request.form_data);

        let record = match existing {
            Some(prior) => {
                // Regeneration keeps the review history of a financial
                // document; only the rendered content changes.
                let kind = if is_financial {
                    match prior.kind {
                        DocumentKind::Financial { approval } => {
                            DocumentKind::Financial { approval }
                        }
                        DocumentKind::Standard => DocumentKind::Financial {
                            approval: ApprovalState::pending(),
                        },
                    }
                } else {
                    DocumentKind::Standard
                };

                let record = DocumentRecord {
                    id: prior.id,
                    client_name,
                    document_type: request.document_type.clone(),
                    pdf_url,
                    docx_url,
                    template_id: Some(template.id),
                    form_data,
                    kind,
                    version: prior.version + 1,
                    created_at: prior.created_at,
                    updated_at: now,
                };

                let updated = self.repo.update_document(&record, prior.version).await?;
                if !updated {
                    // A concurrent regeneration advanced the version; this
                    // call's uploads become orphans.
                    return Err(DocumentError::Conflict);
                }
                record
            }
            None => {
                // A brand-new financial document always starts Pending,
                // whatever the caller tried to pass in the form data.
                let kind = if is_financial {
                    DocumentKind::Financial {
                        approval: ApprovalState::pending(),
                    }
                } else {
                    DocumentKind::Standard
                };

                let record = DocumentRecord {
                    id: Uuid::new_v4(),
                    client_name,
                    document_type: request.document_type.clone(),
                    pdf_url,
                    docx_url,
                    template_id: Some(template.id),
                    form_data,
                    kind,
                    version: 1,
                    created_at: now,
                    updated_at: now,
                };

                self.repo.insert_document(&record).await?;
                record
            }
        };

        cleanup.execute(self.storage.as_ref()).await;

        log::info!(
            "Document {} generated ({} / {})",
            record.id,
            record.pdf_url,
            record.docx_url
        );

        Ok(GenerationOutcome {
            pdf_url: record.pdf_url,
            docx_url: record.docx_url,
            document_id: record.id,
            is_financial_document: is_financial,
        })
    }
}

/// Lowercase-with-underscores form of a field name.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '-' {
                '_'
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

/// Merges the fixed `date_today` field with every form field, normalizing
/// keys. Values pass through untouched; no coercion.
pub fn build_data_dictionary(
    form_data: &serde_json::Map<String, serde_json::Value>,
) -> HashMap<String, serde_json::Value> {
    let mut data = HashMap::with_capacity(form_data.len() + 1);
    data.insert(
        "date_today".to_string(),
        serde_json::Value::String(Local::now().format("%d %b, %Y").to_string()),
    );

    for (key, value) in form_data {
        data.insert(normalize_key(key), value.clone());
    }

    data
}

/// Client-name snapshot taken from the form data, used in storage keys and
/// on the persisted record.
pub fn client_name_snapshot(form_data: &serde_json::Map<String, serde_json::Value>) -> String {
    for candidate in ["client_name", "customer_name"] {
        for (key, value) in form_data {
            if normalize_key(key) == candidate {
                if let Some(name) = value.as_str() {
                    if !name.trim().is_empty() {
                        return name.trim().to_string();
                    }
                }
            }
        }
    }
    "document".to_string()
}

/// Deterministic key prefix from (client snapshot, category, timestamp).
pub fn storage_key_prefix(client_name: &str, category: &str, at: DateTime<Utc>) -> String {
    let client = sanitize_key_part(client_name);
    let category = sanitize_key_part(category);
    format!(
        "documents/{}_{}_{}",
        client,
        category,
        at.format("%Y%m%d%H%M%S%3f")
    )
}

fn sanitize_key_part(part: &str) -> String {
    let sanitized = sanitize_filename::sanitize(part);
    normalize_key(&sanitized)
}

/// Recovers the blob key from a stored serving URL.
pub fn blob_key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(DOCUMENT_SERVE_PREFIX)
}
