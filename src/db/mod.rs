//! Database module - AppState, the repository contract and its Postgres
//! implementation.
//!
//! Split by entity for separation of concerns:
//! - `template` - template persistence
//! - `document` - generated/financial document persistence
//! - `doctype` - document-type configuration and category lookup

mod doctype;
mod document;
mod template;

use crate::doctype::lookup::CategoryLookup;
use crate::doctype::models::DocumentType;
use crate::document::generate::Generator;
use crate::document::models::{ApprovalStatus, DocumentRecord};
use crate::error::DocumentError;
use crate::renderer::{
    DocumentRenderer, PlaceholderExtractor, RenderService, RenderServiceConfig,
};
use crate::storage::{ObjectStorage, SupabaseConfig, SupabaseStorage};
use crate::template::models::Template;
use crate::template::store::TemplateStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use sqlx::PgPool;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Persistence contract for templates, documents and document types.
///
/// Implemented by [`PgDatabase`] in production and by an in-memory double in
/// the integration tests.
#[async_trait]
pub trait Repository {
    async fn insert_template(&self, template: &Template) -> Result<(), DocumentError>;
    async fn update_template(&self, template: &Template) -> Result<(), DocumentError>;
    async fn get_template(&self, id: &Uuid) -> Result<Option<Template>, DocumentError>;
    async fn delete_template(&self, id: &Uuid) -> Result<bool, DocumentError>;
    async fn list_templates(&self) -> Result<Vec<Template>, DocumentError>;
    async fn list_templates_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Template>, DocumentError>;

    async fn get_document(&self, id: &Uuid) -> Result<Option<DocumentRecord>, DocumentError>;
    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError>;
    async fn list_documents_by_type(
        &self,
        document_type: &str,
    ) -> Result<Vec<DocumentRecord>, DocumentError>;
    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DocumentError>;
    /// Optimistic update: returns `Ok(false)` when the stored version no
    /// longer matches `expected_version` (a concurrent writer got there
    /// first).
    async fn update_document(
        &self,
        record: &DocumentRecord,
        expected_version: i64,
    ) -> Result<bool, DocumentError>;
    async fn delete_document(&self, id: &Uuid) -> Result<bool, DocumentError>;
    /// Atomically writes status, reviewer and reviewed-at on a financial
    /// document. Returns `None` when no financial document matched.
    async fn review_document(
        &self,
        id: &Uuid,
        status: ApprovalStatus,
        reviewer: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<DocumentRecord>, DocumentError>;

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, DocumentError>;
    async fn get_document_type(&self, name: &str)
        -> Result<Option<DocumentType>, DocumentError>;
    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), DocumentError>;
    async fn delete_document_type(&self, name: &str) -> Result<bool, DocumentError>;
}

pub(crate) const DOCUMENT_TYPE_CACHE_KEY: &str = "document_types";

/// Postgres-backed repository. The document-type list is cached with a short
/// TTL since category classification runs on every generation.
pub struct PgDatabase {
    pub pool: PgPool,
    pub(crate) type_cache: Cache<String, Vec<DocumentType>>,
}

impl PgDatabase {
    pub fn new(pool: PgPool) -> Self {
        let type_cache = Cache::builder()
            .time_to_live(Duration::from_secs(10 * 60))
            .max_capacity(10)
            .build();

        PgDatabase { pool, type_cache }
    }
}

#[async_trait]
impl Repository for PgDatabase {
    async fn insert_template(&self, template: &Template) -> Result<(), DocumentError> {
        self.pg_insert_template(template).await
    }

    async fn update_template(&self, template: &Template) -> Result<(), DocumentError> {
        self.pg_update_template(template).await
    }

    async fn get_template(&self, id: &Uuid) -> Result<Option<Template>, DocumentError> {
        self.pg_get_template(id).await
    }

    async fn delete_template(&self, id: &Uuid) -> Result<bool, DocumentError> {
        self.pg_delete_template(id).await
    }

    async fn list_templates(&self) -> Result<Vec<Template>, DocumentError> {
        self.pg_list_templates().await
    }

    async fn list_templates_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<Template>, DocumentError> {
        self.pg_list_templates_by_category(category).await
    }

    async fn get_document(&self, id: &Uuid) -> Result<Option<DocumentRecord>, DocumentError> {
        self.pg_get_document(id).await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentRecord>, DocumentError> {
        self.pg_list_documents().await
    }

    async fn list_documents_by_type(
        &self,
        document_type: &str,
    ) -> Result<Vec<DocumentRecord>, DocumentError> {
        self.pg_list_documents_by_type(document_type).await
    }

    async fn insert_document(&self, record: &DocumentRecord) -> Result<(), DocumentError> {
        self.pg_insert_document(record).await
    }

    async fn update_document(
        &self,
        record: &DocumentRecord,
        expected_version: i64,
    ) -> Result<bool, DocumentError> {
        self.pg_update_document(record, expected_version).await
    }

    async fn delete_document(&self, id: &Uuid) -> Result<bool, DocumentError> {
        self.pg_delete_document(id).await
    }

    async fn review_document(
        &self,
        id: &Uuid,
        status: ApprovalStatus,
        reviewer: &str,
        reviewed_at: DateTime<Utc>,
    ) -> Result<Option<DocumentRecord>, DocumentError> {
        self.pg_review_document(id, status, reviewer, reviewed_at).await
    }

    async fn list_document_types(&self) -> Result<Vec<DocumentType>, DocumentError> {
        self.pg_list_document_types().await
    }

    async fn get_document_type(
        &self,
        name: &str,
    ) -> Result<Option<DocumentType>, DocumentError> {
        self.pg_get_document_type(name).await
    }

    async fn insert_document_type(&self, doc_type: &DocumentType) -> Result<(), DocumentError> {
        self.pg_insert_document_type(doc_type).await
    }

    async fn delete_document_type(&self, name: &str) -> Result<bool, DocumentError> {
        self.pg_delete_document_type(name).await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository + Send + Sync>,
    pub storage: Arc<dyn ObjectStorage + Send + Sync>,
    pub extractor: Arc<dyn PlaceholderExtractor + Send + Sync>,
    pub templates: TemplateStore,
    pub generator: Generator,
}

impl AppState {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok(); // Load .env file
        let supabase_config = SupabaseConfig::from_env()?;
        let renderer_config = RenderServiceConfig::from_env()?;
        Self::new_with_config(supabase_config, renderer_config).await
    }

    pub async fn new_with_config(
        supabase_config: SupabaseConfig,
        renderer_config: RenderServiceConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let database_url =
            env::var("SUPABASE_DATABASE_URL").expect("SUPABASE_DATABASE_URL must be set");

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(100)
            .min_connections(10)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(900))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&database_url)
            .await?;

        let http_client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent("solardocs-server/0.3")
            .build()
            .expect("Failed to create reqwest client");

        let db = Arc::new(PgDatabase::new(pool));
        let storage = Arc::new(SupabaseStorage::new(supabase_config, http_client.clone()));
        let render_service = Arc::new(RenderService::new(renderer_config, http_client));

        let repo: Arc<dyn Repository + Send + Sync> = db.clone();
        let categories: Arc<dyn CategoryLookup + Send + Sync> = db;
        let storage: Arc<dyn ObjectStorage + Send + Sync> = storage;
        let renderer: Arc<dyn DocumentRenderer + Send + Sync> = render_service.clone();
        let extractor: Arc<dyn PlaceholderExtractor + Send + Sync> = render_service;

        Ok(Self::new_with_components(
            repo, storage, renderer, extractor, categories,
        ))
    }

    /// Wires the state from pre-built components. Tests use this with
    /// in-memory doubles instead of Postgres and Supabase.
    pub fn new_with_components(
        repo: Arc<dyn Repository + Send + Sync>,
        storage: Arc<dyn ObjectStorage + Send + Sync>,
        renderer: Arc<dyn DocumentRenderer + Send + Sync>,
        extractor: Arc<dyn PlaceholderExtractor + Send + Sync>,
        categories: Arc<dyn CategoryLookup + Send + Sync>,
    ) -> Self {
        let templates = TemplateStore::new(repo.clone(), storage.clone());
        let generator = Generator::new(
            repo.clone(),
            storage.clone(),
            renderer,
            categories,
        );

        AppState {
            repo,
            storage,
            extractor,
            templates,
            generator,
        }
    }
}
