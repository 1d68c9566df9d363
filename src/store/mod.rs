use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

mod collection;
mod document;
mod error;
mod memory;

pub use collection::Collection;
pub use document::{get_i64, get_str, Document};
pub use error::StoreError;
pub use memory::MemoryStore;

/// Flat key/value image of a stored record.
pub type RawDocument = serde_json::Map<String, Value>;

/// One indexed field of a collection.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub field: &'static str,
    pub name: &'static str,
    pub unique: bool,
}

/// Outcome of a single-document insert.
#[derive(Debug, Clone, Copy)]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Option<Uuid>,
}

/// Outcome of a single-document update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub modified_count: u64,
}

/// Document-oriented storage backend. Collections are addressed by name and
/// hold flat documents; lookups that match nothing return `None` rather than
/// an error.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Registers the indexes of a collection. Must run before the first
    /// insert into it.
    async fn create_indexes(&self, collection: &str, specs: &[IndexSpec]) -> Result<(), StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid)
        -> Result<Option<RawDocument>, StoreError>;

    /// Returns a document matching every field of `filter`.
    async fn find_one(
        &self,
        collection: &str,
        filter: &RawDocument,
    ) -> Result<Option<RawDocument>, StoreError>;

    /// Inserts one document, assigning its id.
    async fn insert_one(
        &self,
        collection: &str,
        document: RawDocument,
    ) -> Result<InsertResult, StoreError>;

    /// Sets the fields of `set` on the first document matching `filter`. A
    /// document counts as modified only when a field value actually changed.
    async fn update_one(
        &self,
        collection: &str,
        filter: &RawDocument,
        set: &RawDocument,
    ) -> Result<UpdateResult, StoreError>;
}

/// Single-field filter or `$set`-style update document.
pub fn doc(key: &str, value: impl Into<Value>) -> RawDocument {
    let mut map = RawDocument::new();
    map.insert(key.to_owned(), value.into());
    map
}
