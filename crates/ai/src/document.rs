//! Resume document retrieval collaborator.

use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The referenced document does not exist. Permanent.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Storage is unreachable or timing out. Retryable.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

impl DocumentError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Fetches the text content of an uploaded document by its opaque reference.
pub trait DocumentFetcher: Send + Sync {
    fn fetch(&self, document_ref: &str) -> Result<String, DocumentError>;
}

/// In-memory document store for dev/tests.
#[derive(Debug, Default)]
pub struct InMemoryDocuments {
    documents: RwLock<HashMap<String, String>>,
}

impl InMemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, document_ref: impl Into<String>, content: impl Into<String>) {
        self.documents
            .write()
            .unwrap()
            .insert(document_ref.into(), content.into());
    }
}

impl DocumentFetcher for InMemoryDocuments {
    fn fetch(&self, document_ref: &str) -> Result<String, DocumentError> {
        self.documents
            .read()
            .unwrap()
            .get(document_ref)
            .cloned()
            .ok_or_else(|| DocumentError::NotFound(document_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_round_trip() {
        let docs = InMemoryDocuments::new();
        docs.put("doc://cv", "resume text");
        assert_eq!(docs.fetch("doc://cv").unwrap(), "resume text");
    }

    #[test]
    fn missing_document_is_permanent() {
        let docs = InMemoryDocuments::new();
        let err = docs.fetch("doc://nope").unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
        assert!(!err.is_transient());
    }
}
