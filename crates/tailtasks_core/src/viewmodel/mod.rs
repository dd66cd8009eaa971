//! View-models mediating between the store and the UI.
//!
//! # Responsibility
//! - Hold observable list state as live query subscriptions.
//! - Validate form input before any command reaches the store.
//! - Enqueue commands and hand back [`crate::store::Pending`] handles.
//!
//! # Invariants
//! - A rejected command never enqueues a store job.
//! - Commands never block past enqueueing.

pub mod dogs;
pub mod todos;

use crate::repo::RepoError;
use crate::store::StoreError;
use crate::validation::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ViewModelResult<T> = Result<T, ViewModelError>;

/// Error surfaced to view-model callers.
#[derive(Debug)]
pub enum ViewModelError {
    /// Input was rejected before reaching the store.
    Validation(ValidationError),
    /// Store job failed or the worker is gone.
    Store(StoreError),
}

impl ViewModelError {
    /// True when the target record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::Repo(RepoError::NotFound(_))))
    }

    /// True when the write broke a schema constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Repo(RepoError::ConstraintViolation(_)))
        )
    }
}

impl Display for ViewModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ViewModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ViewModelError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ViewModelError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Repo(RepoError::Validation(err)) => Self::Validation(err),
            other => Self::Store(other),
        }
    }
}
