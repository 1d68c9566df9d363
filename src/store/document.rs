use uuid::Uuid;

use super::{IndexSpec, RawDocument, StoreError};

/// A record type persisted in one collection of the document store.
pub trait Document: Default + Send + Sync + 'static {
    /// Hands the record the identifier the store assigned at insert. The id
    /// is set once and never reassigned.
    fn assign_id(&mut self, id: Uuid);

    /// Indexes the collection holding this kind of document must have.
    fn index_models() -> Vec<IndexSpec>;

    /// Flat key/value image of every attribute, persisted verbatim.
    fn to_document(&self) -> RawDocument;

    /// Populates every attribute from a stored image. Fails on the first
    /// missing or malformed key instead of defaulting.
    fn load(&mut self, doc: &RawDocument) -> Result<(), StoreError>;
}

pub fn get_str(doc: &RawDocument, field: &'static str) -> Result<String, StoreError> {
    let value = doc.get(field).ok_or(StoreError::MissingField { field })?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or(StoreError::InvalidField { field })
}

pub fn get_i64(doc: &RawDocument, field: &'static str) -> Result<i64, StoreError> {
    let value = doc.get(field).ok_or(StoreError::MissingField { field })?;
    value.as_i64().ok_or(StoreError::InvalidField { field })
}
