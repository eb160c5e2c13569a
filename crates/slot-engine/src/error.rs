//! Error types for slot-engine operations.
//!
//! "Nothing free" is never an error: the engine reports it as an empty list,
//! `None`, `false` or [`BookingOutcome::SlotUnavailable`](crate::booking::BookingOutcome).

use thiserror::Error;

use crate::model::{ProviderId, ServiceId};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid service: {0}")]
    InvalidService(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceId),

    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl EngineError {
    /// Whether the caller may retry the same request unchanged.
    ///
    /// Only data-access failures qualify; every other variant describes a
    /// request that will keep failing.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Repository(_))
    }
}

/// Failure reported by a data-access collaborator.
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Data access failed: {0}")]
    Unavailable(String),

    #[error("Fixture parse error: {0}")]
    Fixture(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Result alias for repository trait methods.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;
