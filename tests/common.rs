#![allow(dead_code)]

//! Shared test doubles: in-memory repository, mock object storage and a stub
//! render service. These stand in for Postgres, Supabase Storage and the
//! external renderer so the workflow can be exercised end to end in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use solardocs_server::db::{AppState, Repository};
use solardocs_server::doctype::lookup::{CategoryClass, CategoryLookup, PROPOSAL_CATEGORY};
use solardocs_server::doctype::models::DocumentType;
use solardocs_server::document::models::{ApprovalState, ApprovalStatus, DocumentKind, DocumentRecord};
use solardocs_server::error::DocumentError;
use solardocs_server::renderer::{DocumentRenderer, PlaceholderExtractor, RenderedArtifacts};
use solardocs_server::storage::ObjectStorage;
use solardocs_server::template::models::Template;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub const STUB_PDF: &[u8] = b"%PDF-stub";
pub const STUB_DOCX: &[u8] = b"PK-docx-stub";

/// In-memory object storage, same shape as the production Supabase client.
pub struct MockObjectStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fail_uploads: AtomicBool,
    fail_downloads: AtomicBool,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            fail_uploads: AtomicBool::new(false),
            fail_downloads: AtomicBool::new(false),
        }
    }

    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn stored_keys(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_downloads(&self, fail: bool) {
        self.fail_downloads.store(fail, Ordering::SeqCst);
    }

    pub fn remove(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn upload_file(&self, key: &str, file_data: &[u8]) -> Result<(), String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err("simulated upload failure".to_string());
        }
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), file_data.to_vec());
        Ok(())
    }

    async fn download_file(&self, key: &str) -> Result<Vec<u8>, String> {
        if self.fail_downloads.load(Ordering::SeqCst) {
            return Err("simulated download failure".to_string());
        }
        self.files
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| format!("object '{}' not found", key))
    }

    async fn delete_file(&self, key: &str) -> Result<(), String> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    fn get_asset_url(&self, key: &str) -> String {
        format!("http://blobs.test.example.com/{}", key)
    }
}

/// Stub renderer. Records what it was called with so tests can assert on the
/// scratch path and the data dictionary after the call returns.
pub struct StubRenderer {
    pub seen_template_path: Mutex<Option<PathBuf>>,
    pub seen_data: Mutex<Option<HashMap<String, serde_json::Value>>>,
    fail: AtomicBool,
}

impl StubRenderer {
    pub fn new() -> Self {
        Self {
            seen_template_path: Mutex::new(None),
            seen_data: Mutex::new(None),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_template_path(&self) -> Option<PathBuf> {
        self.seen_template_path.lock().unwrap().clone()
    }

    pub fn last_data(&self) -> Option<HashMap<String, serde_json::Value>> {
        self.seen_data.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentRenderer for StubRenderer {
    async fn render(
        &self,
        template_path: &std::path::Path,
        data: &HashMap<String, serde_json::Value>,
    ) -> Result<RenderedArtifacts, DocumentError> {
        assert!(
            template_path.exists(),
            "scratch file must exist while the renderer runs"
        );

        *self.seen_template_path.lock().unwrap() = Some(template_path.to_path_buf());
        *self.seen_data.lock().unwrap() = Some(data.clone());

        if self.fail.load(Ordering::SeqCst) {
            return Err(DocumentError::Render("simulated renderer failure".to_string()));
        }

        Ok(RenderedArtifacts {
            pdf: STUB_PDF.to_vec(),
            docx: STUB_DOCX.to_vec(),
        })
    }
}

pub struct StubExtractor;

#[async_trait]
impl PlaceholderExtractor for StubExtractor {
    async fn extract(
        &self,
        _filename: &str,
        _file_data: Vec<u8>,
    ) -> Result<serde_json::Value, DocumentError> {
        Ok(serde_json::json!({ "placeholders": ["client_name", "amount"] }))
    }
}

/// In-memory repository double implementing both the persistence contract
/// and category lookup, mirroring the production PgDatabase.
pub struct InMemoryRepository {
    templates: Mutex<HashMap<Uuid, Template>>,
    documents: Mutex<HashMap<Uuid, DocumentRecord>>,
    doc_types: Mutex<Vec<DocumentType>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            templates: Mutex::new(HashMap::new()),
            documents: Mutex::new(HashMap::new()),
            doc_types: Mutex::new(Vec::new()),
        }
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_template(&self, template: &Template) -> Result<(), DocumentError> {
        self.templates
            .lock()
            .unwrap()
            .insert(template.id, template.clone());
        Ok(())
    }

    async fn update_template(&self, template: &Template) -> Result<(), DocumentError> {
        self.templates
            .lock()
            .unwrap()
            .insert(template.id, template.clone());
        Ok(())
    }

    async fn get_template(&self, id: &Uuid) -> Result<Option<Template>, DocumentError> {
        Ok(self.templates.lock().unwrap().get(id).cloned())
    }

    async fn delete_template(&self, id: &Uuid) -> Result<bool, DocumentError> {
        Ok(self.templates.lock().unwrap().remove(id).is_some())
    }

    async fn list_templates(&self) -> Result<Vec<Template>, DocumentError> {
        let mut templates: Vec<Template> =
            self.templates.lock().unwrap().values().cloned().collect();
        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(templates)
    }

    async fn list_templates_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Template>, DocumentError> {
        let templates = self
            .templates
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.category == category)
            .cloned()
            .collect();
        Ok(templates)
    }

    async fn get_document(&self, id: &Uuid) -> Result<Option<DocumentRecord>, DocumentError> {
        Ok(self.documents.lock().unwrap().get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError> {
        let mut documents: Vec<DocumentRecord> =
            self.documents.lock().unwrap().values().cloned().collect();
        documents.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(documents)
    }

    async fn list_documents_by_type(
        &self,
        document_type: &str,
    ) -> Result<Vec<DocumentRecord>, DocumentError> {
        let documents = self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.document_type == document_type)
            .cloned()
            .collect();
        Ok(documents)
    }

    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DocumentError> {
        self.documents
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(())
    }

    async fn update_document(
        &self,
        record: &DocumentRecord,
        expected_version: i64,
    ) -> Result<bool, DocumentError> {
        let mut documents = self.documents.lock().unwrap();
        match documents.get(&record.id) {
            Some(stored) if stored.version == expected_version => {
                documents.insert(record.id, record.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Ok(false),
        }
    }

    async fn delete_document(&self, id: &Uuid) -> Result<bool, DocumentError> {
        Ok(self.documents.lock().unwrap().remove(id).is_some())
    }

    async fn review_document(
        &self,
        id: &Uuid,
        status: ApprovalStatus,
        reviewer: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<DocumentRecord>, DocumentError> {
        let mut documents = self.documents.lock().unwrap();
        let Some(document) = documents.get_mut(id) else {
            return Ok(None);
        };

        match &mut document.kind {
            DocumentKind::Financial { approval } => {
                *approval = ApprovalState {
                    status,
                    reviewed_by: Some(reviewer.to_string()),
                    reviewed_at: Some(reviewed_at),
                };
                document.updated_at = reviewed_at;
                Ok(Some(document.clone()))
            }
            DocumentKind::Standard => Ok(None),
        }
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, DocumentError> {
        Ok(self.doc_types.lock().unwrap().clone())
    }

    async fn get_document_type(
        &self,
        name: &str,
    ) -> Result<Option<DocumentType>, DocumentError> {
        Ok(self
            .doc_types
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), DocumentError> {
        self.doc_types.lock().unwrap().push(doc_type.clone());
        Ok(())
    }

    async fn delete_document_type(&self, name: &str) -> Result<bool, DocumentError> {
        let mut doc_types = self.doc_types.lock().unwrap();
        let before = doc_types.len();
        doc_types.retain(|t| t.name != name);
        Ok(doc_types.len() < before)
    }
}

#[async_trait]
impl CategoryLookup for InMemoryRepository {
    async fn classify(&self, name: &str) -> Result<Option<CategoryClass>, DocumentError> {
        if name == PROPOSAL_CATEGORY {
            return Ok(Some(CategoryClass::NonFinancial));
        }
        Ok(self
            .doc_types
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == name)
            .map(|t| {
                if t.is_financial {
                    CategoryClass::Financial
                } else {
                    CategoryClass::NonFinancial
                }
            }))
    }
}

/// All doubles wired into an AppState, plus handles to poke at them.
pub struct TestEnv {
    pub repo: Arc<InMemoryRepository>,
    pub storage: Arc<MockObjectStorage>,
    pub renderer: Arc<StubRenderer>,
    pub state: AppState,
}

pub fn setup() -> TestEnv {
    let repo = Arc::new(InMemoryRepository::new());
    let storage = Arc::new(MockObjectStorage::new());
    let renderer = Arc::new(StubRenderer::new());

    let state = AppState::new_with_components(
        repo.clone(),
        storage.clone(),
        renderer.clone(),
        Arc::new(StubExtractor),
        repo.clone(),
    );

    TestEnv {
        repo,
        storage,
        renderer,
        state,
    }
}

/// Uploads a template binary and inserts the matching record.
pub async fn seed_template(env: &TestEnv, name: &str, category: &str) -> Template {
    let blob_key = format!("templates/{}_{}.docx", Uuid::new_v4(), name.to_lowercase());
    env.storage
        .upload_file(&blob_key, b"template bytes")
        .await
        .expect("seed upload should succeed");

    let template = env
        .state
        .templates
        .create_or_update(
            None,
            name.to_string(),
            category.to_string(),
            Some(blob_key),
            None,
        )
        .await
        .expect("seed template should persist");
    template
}

pub async fn seed_document_type(env: &TestEnv, name: &str, is_financial: bool) -> DocumentType {
    let doc_type = DocumentType::new(name.to_string(), is_financial);
    env.repo
        .insert_document_type(&doc_type)
        .await
        .expect("seed document type should persist");
    doc_type
}

pub fn form(entries: &[(&str, serde_json::Value)]) -> serde_json::Map<String, serde_json::Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
