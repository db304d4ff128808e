//! Runtime category classification.
//!
//! Financial-ness is a property of the configured document-type name, not a
//! compile-time type. The orchestrator only sees this trait; the
//! configuration schema stays behind it.

use crate::error::DocumentError;
use async_trait::async_trait;

/// The built-in category that exists without any configuration row.
pub const PROPOSAL_CATEGORY: &str = "Proposal";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryClass {
    NonFinancial,
    Financial,
}

impl CategoryClass {
    pub fn is_financial(&self) -> bool {
        matches!(self, CategoryClass::Financial)
    }
}

/// Classifies a document category name. `None` means the name is neither the
/// built-in "Proposal" tag nor a registered document type.
#[async_trait]
pub trait CategoryLookup {
    async fn classify(&self, name: &str) -> Result<Option<CategoryClass>, DocumentError>;
}
