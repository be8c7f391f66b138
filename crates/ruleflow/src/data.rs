//! The data item a program runs over.

/// One record pulled from a data source.
///
/// The engine only ever touches `payload`; the identity travels through a
/// run unchanged so the caller can tie the processed item back to its
/// source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Data<P> {
    /// Constant identifier of the item, if the source has one.
    pub id: Option<String>,
    /// The actual data, transformed in place by the program's rules.
    pub payload: P,
}

impl<P> Data<P> {
    /// An item with no identity.
    pub fn new(payload: P) -> Self {
        Self { id: None, payload }
    }

    /// An item tagged with a source identifier.
    pub fn with_id(id: impl Into<String>, payload: P) -> Self {
        Self {
            id: Some(id.into()),
            payload,
        }
    }
}
