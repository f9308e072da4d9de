//! Knowledge retrieval for the optional per-agent retrieval hook
//!
//! - `InMemoryRetriever` - core `Retriever` trait implementation over an
//!   in-process corpus; no vector store or external index

pub mod in_memory;

pub use in_memory::InMemoryRetriever;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("search error: {0}")]
    Search(String),
}

impl From<RagError> for dialogue_core::Error {
    fn from(err: RagError) -> Self {
        dialogue_core::Error::Serialization(err.to_string())
    }
}
