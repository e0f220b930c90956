//! In-memory [`DocumentStore`] used by tests and local runs.

use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use uuid::Uuid;

use super::{
    CollectionPath, Direction, Document, DocumentId, DocumentStore, Filter, OrderBy, StoreError,
    TransactionUpdate,
};

/// DashMap-backed store: one map per collection path, documents keyed by id.
///
/// Mutations on a single document are atomic (the shard entry is held across
/// the read-modify-write in [`DocumentStore::run_transaction`]); there is no
/// cross-document atomicity, matching the gateway contract.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: DashMap<String, DashMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(
        &self,
        collection: &CollectionPath,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection.as_str())
            .and_then(|coll| coll.get(id).map(|doc| doc.clone())))
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: DocumentId,
        document: Document,
    ) -> Result<String, StoreError> {
        let id = match id {
            DocumentId::Assigned(id) => id,
            DocumentId::Auto => Uuid::new_v4().to_string(),
        };
        self.collections
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        let coll = self
            .collections
            .get(collection.as_str())
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        let mut doc = coll
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        for (field, value) in patch {
            doc.insert(field, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &CollectionPath, id: &str) -> Result<(), StoreError> {
        if let Some(coll) = self.collections.get(collection.as_str()) {
            coll.remove(id);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[Filter],
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<(String, Document)>, StoreError> {
        let mut results: Vec<(String, Document)> = match self.collections.get(collection.as_str()) {
            Some(coll) => coll
                .iter()
                .filter(|entry| filters.iter().all(|f| f.matches(entry.value())))
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
            None => Vec::new(),
        };

        match order_by {
            Some(order) => {
                results.sort_by(|(id_a, doc_a), (id_b, doc_b)| {
                    let a = doc_a.get(&order.field).unwrap_or(&Value::Null);
                    let b = doc_b.get(&order.field).unwrap_or(&Value::Null);
                    let ordering = compare_values(a, b).then_with(|| id_a.cmp(id_b));
                    match order.direction {
                        Direction::Asc => ordering,
                        Direction::Desc => ordering.reverse(),
                    }
                });
            }
            // Deterministic default ordering by document id.
            None => results.sort_by(|(id_a, _), (id_b, _)| id_a.cmp(id_b)),
        }

        Ok(results)
    }

    async fn run_transaction(
        &self,
        collection: &CollectionPath,
        id: &str,
        apply: &TransactionUpdate,
    ) -> Result<Document, StoreError> {
        // The entry guard pins the shard for the duration of the
        // read-modify-write, making the transaction atomic per document.
        let coll = self
            .collections
            .entry(collection.as_str().to_string())
            .or_default();
        let current = coll.get(id).map(|doc| doc.clone());
        let updated = apply(current.as_ref())?;
        coll.insert(id.to_string(), updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("orders");

        let id = store
            .set(
                &path,
                DocumentId::Assigned("ORD_000000001".into()),
                doc(&[("status", json!("pending"))]),
            )
            .await
            .unwrap();
        assert_eq!(id, "ORD_000000001");

        let fetched = store.get(&path, &id).await.unwrap().unwrap();
        assert_eq!(fetched.get("status"), Some(&json!("pending")));
    }

    #[tokio::test]
    async fn auto_id_generates_unique_keys() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("orders/ORD_1/order_items");

        let a = store
            .set(&path, DocumentId::Auto, doc(&[("name", json!("a"))]))
            .await
            .unwrap();
        let b = store
            .set(&path, DocumentId::Auto, doc(&[("name", json!("b"))]))
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(store.query(&path, &[], None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_merges_and_requires_existing_document() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("users/u1/cart");

        store
            .set(
                &path,
                DocumentId::Assigned("c1".into()),
                doc(&[("status", json!("active")), ("itemCount", json!(2))]),
            )
            .await
            .unwrap();

        store
            .update(&path, "c1", doc(&[("status", json!("inactive"))]))
            .await
            .unwrap();

        let fetched = store.get(&path, "c1").await.unwrap().unwrap();
        assert_eq!(fetched.get("status"), Some(&json!("inactive")));
        assert_eq!(fetched.get("itemCount"), Some(&json!(2)));

        let err = store
            .update(&path, "missing", doc(&[("status", json!("x"))]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("users/u1/cart");

        store
            .set(&path, DocumentId::Assigned("c1".into()), Document::new())
            .await
            .unwrap();
        store.delete(&path, "c1").await.unwrap();
        store.delete(&path, "c1").await.unwrap();

        assert!(store.get(&path, "c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn query_filters_and_orders() {
        let store = MemoryStore::new();
        let path = CollectionPath::new("users/u1/cart");

        for (id, status, added) in [
            ("c1", "inactive", "2024-01-01T00:00:00Z"),
            ("c2", "active", "2024-03-01T00:00:00Z"),
            ("c3", "active", "2024-02-01T00:00:00Z"),
        ] {
            store
                .set(
                    &path,
                    DocumentId::Assigned(id.into()),
                    doc(&[("status", json!(status)), ("addedAt", json!(added))]),
                )
                .await
                .unwrap();
        }

        let active = store
            .query(
                &path,
                &[Filter::eq("status", "active")],
                Some(&OrderBy::asc("addedAt")),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = active.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["c3", "c2"]);
    }

    #[tokio::test]
    async fn transaction_applies_atomically_under_contention() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let path = CollectionPath::new("restaurants/r1/menu_items");

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            let path = path.clone();
            handles.push(tokio::spawn(async move {
                store
                    .run_transaction(&path, "m1", &|current| {
                        let count = current
                            .and_then(|doc| doc.get("count"))
                            .and_then(Value::as_i64)
                            .unwrap_or(0);
                        let mut doc = current.cloned().unwrap_or_default();
                        doc.insert("count".into(), json!(count + 1));
                        Ok(doc)
                    })
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let fetched = store.get(&path, "m1").await.unwrap().unwrap();
        assert_eq!(fetched.get("count"), Some(&json!(50)));
    }
}
