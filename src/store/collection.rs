use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use super::{Document, DocumentStore, InsertResult, RawDocument, StoreError, UpdateResult};

/// Typed handle to one named collection of `T` documents.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, name: impl Into<String>) -> Self {
        Self {
            store,
            name: name.into(),
            _marker: PhantomData,
        }
    }

    /// Creates the indexes `T` declares. Must run before the first insert.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        self.store
            .create_indexes(&self.name, &T::index_models())
            .await
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        match self.store.find_by_id(&self.name, id).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub async fn find_one(&self, filter: RawDocument) -> Result<Option<T>, StoreError> {
        match self.store.find_one(&self.name, &filter).await? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Inserts `record` and assigns it the id the store handed back.
    pub async fn insert_one(&self, record: &mut T) -> Result<InsertResult, StoreError> {
        let result = self
            .store
            .insert_one(&self.name, record.to_document())
            .await?;
        if let Some(id) = result.inserted_id {
            record.assign_id(id);
        }
        Ok(result)
    }

    pub async fn update_one(
        &self,
        filter: RawDocument,
        set: RawDocument,
    ) -> Result<UpdateResult, StoreError> {
        self.store.update_one(&self.name, &filter, &set).await
    }
}

fn decode<T: Document>(raw: &RawDocument) -> Result<T, StoreError> {
    let mut record = T::default();
    record.load(raw)?;
    Ok(record)
}
