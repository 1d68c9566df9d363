use thiserror::Error;

/// Failures surfaced by the document store and its adapters. Lookup misses
/// are not errors; they come back as `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected an insert or update.
    #[error("unique index `{index}` violated")]
    ConstraintViolation { index: String },

    /// A stored document lacks an expected attribute.
    #[error("stored document is missing field `{field}`")]
    MissingField { field: &'static str },

    /// A stored attribute has an unexpected shape.
    #[error("stored document has a malformed field `{field}`")]
    InvalidField { field: &'static str },
}
