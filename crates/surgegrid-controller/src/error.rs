//! Controller error types.

use thiserror::Error;

/// Errors that can occur during placement and scaling operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("capacity catalog lookup failed: {0}")]
    Catalog(#[from] surge_core::CatalogError),

    #[error("failed to launch process: {0}")]
    Sim(#[from] surge_sim::SimError),
}

pub type ControllerResult<T> = Result<T, ControllerError>;
