//! Object storage abstraction and the Supabase Storage implementation.
//!
//! Template binaries and rendered artifacts live in a single bucket. The
//! trait keeps handlers and the generation pipeline independent from the
//! concrete backend so tests can swap in an in-memory store.

use async_trait::async_trait;
use std::env;

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub bucket_name: String,
}

impl SupabaseConfig {
    pub fn from_env() -> Result<Self, String> {
        let supabase_url =
            env::var("SUPABASE_URL").map_err(|_| "SUPABASE_URL must be set".to_string())?;
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| "SUPABASE_ANON_KEY must be set".to_string())?;
        let bucket_name =
            env::var("SUPABASE_BUCKET").unwrap_or_else(|_| "solardocs-bucket".to_string());

        Ok(SupabaseConfig {
            supabase_url,
            supabase_anon_key,
            bucket_name,
        })
    }
}

/// Blob store seen as a flat key/value namespace.
///
/// All errors are plain strings; callers decide whether a failure blocks the
/// operation or is logged and swallowed (best-effort deletes).
#[async_trait]
pub trait ObjectStorage {
    async fn upload_file(&self, key: &str, file_data: &[u8]) -> Result<(), String>;

    async fn download_file(&self, key: &str) -> Result<Vec<u8>, String>;

    async fn delete_file(&self, key: &str) -> Result<(), String>;

    /// Public URL for serving a stored object.
    fn get_asset_url(&self, key: &str) -> String;
}

pub struct SupabaseStorage {
    config: SupabaseConfig,
    client: reqwest::Client,
}

impl SupabaseStorage {
    pub fn new(config: SupabaseConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.supabase_url, self.config.bucket_name, key
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload_file(&self, key: &str, file_data: &[u8]) -> Result<(), String> {
        let content_type = mime_guess::from_path(key)
            .first_or_octet_stream()
            .to_string();

        let response = self
            .client
            .post(self.object_url(key))
            .bearer_auth(&self.config.supabase_anon_key)
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(file_data.to_vec())
            .send()
            .await
            .map_err(|e| format!("Failed to upload '{}' to Supabase: {}", key, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "Supabase upload for '{}' returned {}: {}",
                key, status, body
            ));
        }

        log::debug!("Uploaded '{}' to bucket '{}'", key, self.config.bucket_name);
        Ok(())
    }

    async fn download_file(&self, key: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(self.object_url(key))
            .bearer_auth(&self.config.supabase_anon_key)
            .send()
            .await
            .map_err(|e| format!("Failed to download '{}' from Supabase: {}", key, e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Supabase download for '{}' returned {}",
                key,
                response.status()
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("Failed to read body for '{}': {}", key, e))?;
        Ok(bytes.to_vec())
    }

    async fn delete_file(&self, key: &str) -> Result<(), String> {
        let response = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(&self.config.supabase_anon_key)
            .send()
            .await
            .map_err(|e| format!("Failed to delete '{}' from Supabase: {}", key, e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Supabase delete for '{}' returned {}",
                key,
                response.status()
            ));
        }

        Ok(())
    }

    fn get_asset_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.supabase_url, self.config.bucket_name, key
        )
    }
}
