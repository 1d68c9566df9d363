use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DocumentStore, IndexSpec, InsertResult, RawDocument, StoreError, UpdateResult};

/// Process-local document engine backing the demo application and the tests.
/// Each write holds the collection map exclusively, so updates are atomic at
/// document granularity.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Bucket>>,
}

#[derive(Default)]
struct Bucket {
    docs: HashMap<Uuid, RawDocument>,
    unique: Vec<IndexSpec>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches(doc: &RawDocument, filter: &RawDocument) -> bool {
    filter.iter().all(|(key, value)| doc.get(key) == Some(value))
}

impl Bucket {
    /// First unique index some other document already occupies for a value
    /// in `incoming`. `exclude` skips the document being updated.
    fn conflict(&self, incoming: &RawDocument, exclude: Option<Uuid>) -> Option<&IndexSpec> {
        self.unique.iter().find(|spec| {
            let Some(value) = incoming.get(spec.field) else {
                return false;
            };
            self.docs
                .iter()
                .any(|(id, doc)| Some(*id) != exclude && doc.get(spec.field) == Some(value))
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_indexes(&self, collection: &str, specs: &[IndexSpec]) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let bucket = collections.entry(collection.to_owned()).or_default();
        bucket.unique = specs.iter().filter(|spec| spec.unique).cloned().collect();
        Ok(())
    }

    async fn find_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<RawDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|bucket| bucket.docs.get(&id).cloned()))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &RawDocument,
    ) -> Result<Option<RawDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|bucket| {
            bucket
                .docs
                .values()
                .find(|doc| matches(doc, filter))
                .cloned()
        }))
    }

    async fn insert_one(
        &self,
        collection: &str,
        mut document: RawDocument,
    ) -> Result<InsertResult, StoreError> {
        let mut collections = self.collections.write().await;
        let bucket = collections.entry(collection.to_owned()).or_default();
        if let Some(spec) = bucket.conflict(&document, None) {
            return Err(StoreError::ConstraintViolation {
                index: spec.name.to_owned(),
            });
        }
        let id = Uuid::new_v4();
        document.insert("_id".to_owned(), Value::String(id.to_string()));
        bucket.docs.insert(id, document);
        Ok(InsertResult {
            acknowledged: true,
            inserted_id: Some(id),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &RawDocument,
        set: &RawDocument,
    ) -> Result<UpdateResult, StoreError> {
        let mut collections = self.collections.write().await;
        let unmodified = UpdateResult {
            acknowledged: true,
            modified_count: 0,
        };
        let Some(bucket) = collections.get_mut(collection) else {
            return Ok(unmodified);
        };
        let Some(id) = bucket
            .docs
            .iter()
            .find(|(_, doc)| matches(doc, filter))
            .map(|(id, _)| *id)
        else {
            return Ok(unmodified);
        };
        if let Some(spec) = bucket.conflict(set, Some(id)) {
            return Err(StoreError::ConstraintViolation {
                index: spec.name.to_owned(),
            });
        }
        let mut modified_count = 0;
        if let Some(doc) = bucket.docs.get_mut(&id) {
            for (key, value) in set {
                if doc.get(key) != Some(value) {
                    doc.insert(key.clone(), value.clone());
                    modified_count = 1;
                }
            }
        }
        Ok(UpdateResult {
            acknowledged: true,
            modified_count,
        })
    }
}
