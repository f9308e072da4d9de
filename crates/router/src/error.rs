//! Crate-wide error type for the staged and dynamic routers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("persistence error: {0}")]
    Store(#[from] dialogue_store::StoreError),

    #[error("{0}")]
    Core(#[from] dialogue_core::Error),
}

pub type Result<T> = std::result::Result<T, RouterError>;
