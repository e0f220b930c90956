//! Document store gateway.
//!
//! All persistence in this crate goes through the [`DocumentStore`] trait:
//! get/set/update/delete/query primitives plus a per-document
//! read-modify-write transaction, addressed by collection path and document
//! id. The production backend lives outside this crate; [`memory::MemoryStore`]
//! is the reference implementation used by tests and local runs.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;

pub mod memory;
pub mod paths;

pub use memory::MemoryStore;
pub use paths::CollectionPath;

/// A stored document: a flat JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Gateway-level error taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction aborted: {0}")]
    TransactionAborted(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Key under which a document is written.
#[derive(Debug, Clone)]
pub enum DocumentId {
    /// Caller-supplied key (e.g. a generated order id).
    Assigned(String),
    /// Store-side unique key generation.
    Auto,
}

/// Equality predicate applied by [`DocumentStore::query`].
#[derive(Debug, Clone)]
pub enum Filter {
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort order applied by [`DocumentStore::query`].
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Read-modify-write body for [`DocumentStore::run_transaction`]. Receives the
/// current document (if any) and returns the full replacement document.
pub type TransactionUpdate = dyn Fn(Option<&Document>) -> Result<Document, StoreError> + Send + Sync;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a single document, `None` when absent.
    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, StoreError>;

    /// Write a full document. Returns the document id actually used (the
    /// assigned one, or the store-generated key for [`DocumentId::Auto`]).
    async fn set(
        &self,
        collection: &CollectionPath,
        id: DocumentId,
        document: Document,
    ) -> Result<String, StoreError>;

    /// Shallow-merge `patch` into an existing document. Fails with
    /// [`StoreError::NotFound`] when the document does not exist. A `null`
    /// patch value clears the field.
    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is a no-op.
    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), StoreError>;

    /// Return all `(id, document)` pairs matching every filter, sorted by
    /// `order_by` when given, otherwise by document id.
    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError>;

    /// Atomic read-modify-write of a single document.
    async fn run_transaction(
        &self,
        collection: &CollectionPath,
        id: &str,
        apply: &TransactionUpdate,
    ) -> Result<Document, StoreError>;
}

/// Serialize a model into its stored document shape.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Deserialize a stored document back into a model.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        count: i32,
    }

    #[test]
    fn to_document_produces_object() {
        let doc = to_document(&Sample {
            name: "x".into(),
            count: 2,
        })
        .unwrap();
        assert_eq!(doc.get("name"), Some(&json!("x")));
        assert_eq!(doc.get("count"), Some(&json!(2)));
    }

    #[test]
    fn to_document_rejects_non_object() {
        let err = to_document(&42).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn document_round_trip() {
        let sample = Sample {
            name: "basket".into(),
            count: 7,
        };
        let doc = to_document(&sample).unwrap();
        let back: Sample = from_document(doc).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn filter_eq_matches_on_field_value() {
        let mut doc = Document::new();
        doc.insert("status".into(), json!("active"));

        assert!(Filter::eq("status", "active").matches(&doc));
        assert!(!Filter::eq("status", "inactive").matches(&doc));
        assert!(!Filter::eq("missing", "active").matches(&doc));
    }
}
