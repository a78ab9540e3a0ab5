use thiserror::Error;

use crate::contract::{error::RemoteError, model::UserId};
use crate::domain::pending::MutationKind;
use crate::domain::validation::ValidationErrors;

/// Where a failure is shown to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSurface {
    /// Persistent banner over the table (list fetch failures).
    Banner,
    /// Transient notification (rejected or conflicting mutations).
    Notification,
    /// Inline next to the editor fields.
    Inline,
}

/// Errors produced by the synchronization core. None of them is fatal;
/// each is recoverable by the operator retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Failed to load users: {source}")]
    FetchFailed {
        #[source]
        source: RemoteError,
    },

    #[error("Failed to {kind} user{}: {source}", target_suffix(.id))]
    MutationFailed {
        kind: MutationKind,
        id: Option<UserId>,
        #[source]
        source: RemoteError,
    },

    #[error("User {id} already has a pending {pending} operation")]
    Conflict { id: UserId, pending: MutationKind },

    #[error("Validation failed: {errors}")]
    ValidationFailed { errors: ValidationErrors },

    #[error("User not found: {id}")]
    NotFound { id: UserId },

    #[error("Cannot {action} while the editor is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
}

fn target_suffix(id: &Option<UserId>) -> String {
    id.map(|id| format!(" {id}")).unwrap_or_default()
}

impl SyncError {
    pub fn fetch_failed(source: RemoteError) -> Self {
        Self::FetchFailed { source }
    }

    pub fn mutation_failed(kind: MutationKind, id: Option<UserId>, source: RemoteError) -> Self {
        Self::MutationFailed { kind, id, source }
    }

    pub fn conflict(id: UserId, pending: MutationKind) -> Self {
        Self::Conflict { id, pending }
    }

    pub fn validation_failed(errors: ValidationErrors) -> Self {
        Self::ValidationFailed { errors }
    }

    pub fn not_found(id: UserId) -> Self {
        Self::NotFound { id }
    }

    pub fn invalid_transition(action: &'static str, state: &'static str) -> Self {
        Self::InvalidTransition { action, state }
    }

    pub fn surface(&self) -> ErrorSurface {
        match self {
            Self::FetchFailed { .. } => ErrorSurface::Banner,
            Self::MutationFailed { .. } | Self::Conflict { .. } | Self::NotFound { .. } => {
                ErrorSurface::Notification
            }
            Self::ValidationFailed { .. } | Self::InvalidTransition { .. } => ErrorSurface::Inline,
        }
    }
}
