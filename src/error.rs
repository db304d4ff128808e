use thiserror::Error;

/// Failure classes of the generation workflow. Handlers map these onto HTTP
/// statuses; everything else in the crate just propagates them with `?`.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The template record is missing, has no uploaded binary, or its blob
    /// cannot be fetched.
    #[error("template unavailable: {0}")]
    TemplateUnavailable(String),

    /// The render service failed or violated its response contract.
    #[error("render failed: {0}")]
    Render(String),

    /// Object storage rejected an upload, download or delete.
    #[error("storage failure: {0}")]
    Storage(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A concurrent regeneration advanced the record version first.
    #[error("document was modified by a concurrent regeneration")]
    Conflict,

    /// The document type is neither built in nor configured.
    #[error("unknown document category '{0}'")]
    UnknownCategory(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl DocumentError {
    pub fn storage(message: impl Into<String>) -> Self {
        DocumentError::Storage(message.into())
    }
}
