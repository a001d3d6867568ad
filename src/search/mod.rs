//! Search layer facade.
//!
//! The session core only talks to [`SearchEngine`]. This module provides:
//!
//! - **[`query`]**: Translation of a [`QuerySpec`] into Tantivy queries (terms, prefix, filters, boosts).
//! - **[`tantivy`]**: In-memory Tantivy index built from a JSON dataset, implementing [`SearchEngine`].

pub mod query;
pub mod tantivy;

use crate::model::types::{DocKey, EngineStatus, QuerySpec, SearchOutcome};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("index error: {0}")]
    Index(String),
    #[error("document {0} not found")]
    MissingDocument(DocKey),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("unknown filter handle")]
    UnknownFilter,
    #[error("engine not ready")]
    NotReady,
}

impl From<::tantivy::TantivyError> for EngineError {
    fn from(err: ::tantivy::TantivyError) -> Self {
        EngineError::Index(err.to_string())
    }
}

/// Contract between the session controller and a search backend.
///
/// Implementations must be safe to call from several threads at once: the
/// performance sampler fans repeated searches out over the rayon pool.
pub trait SearchEngine: Send + Sync {
    fn search(&self, query: &QuerySpec) -> Result<SearchOutcome, EngineError>;

    /// Raw JSON text of a stored document.
    fn document(&self, key: DocKey) -> Result<String, EngineError>;

    fn facetable_fields(&self) -> Vec<String>;

    fn status(&self) -> EngineStatus;
}

impl<T: SearchEngine + ?Sized> SearchEngine for std::sync::Arc<T> {
    fn search(&self, query: &QuerySpec) -> Result<SearchOutcome, EngineError> {
        (**self).search(query)
    }

    fn document(&self, key: DocKey) -> Result<String, EngineError> {
        (**self).document(key)
    }

    fn facetable_fields(&self) -> Vec<String> {
        (**self).facetable_fields()
    }

    fn status(&self) -> EngineStatus {
        (**self).status()
    }
}
