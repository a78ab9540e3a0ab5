use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::contract::{
    client::UsersRemote,
    model::{User, UserDraft, UserId},
};
use crate::domain::cache::UsersCache;
use crate::domain::editor::Submission;
use crate::domain::error::SyncError;
use crate::domain::pending::{MutationKind, PendingOperations};

/// Drives create/update/delete against the remote and folds confirmed
/// results into the cache.
///
/// Each call registers a pending entry first, applies to the cache only after
/// the remote confirms, and releases the entry last. A failed call leaves the
/// cache untouched and is never retried.
#[derive(Clone)]
pub struct MutationCoordinator {
    remote: Arc<dyn UsersRemote>,
    cache: Arc<UsersCache>,
    pending: Arc<PendingOperations>,
}

impl MutationCoordinator {
    pub fn new(
        remote: Arc<dyn UsersRemote>,
        cache: Arc<UsersCache>,
        pending: Arc<PendingOperations>,
    ) -> Self {
        Self {
            remote,
            cache,
            pending,
        }
    }

    pub fn pending(&self) -> &Arc<PendingOperations> {
        &self.pending
    }

    #[instrument(
        name = "users_admin.coordinator.create",
        skip(self, draft),
        fields(name = %draft.name)
    )]
    pub async fn create(&self, draft: UserDraft) -> Result<User, SyncError> {
        info!("Creating user");
        let guard = self.pending.begin(MutationKind::Create, None)?;

        let echo = self.remote.create_user(&draft).await.map_err(|e| {
            warn!(error = %e, "Remote rejected create");
            SyncError::mutation_failed(MutationKind::Create, None, e)
        })?;

        if let Some(remote_id) = echo.id {
            debug!(%remote_id, "Ignoring remote id, ids are allocated locally");
        }
        let user = self.cache.apply_create(draft.merge(echo.fields));
        drop(guard);

        info!(user_id = %user.id, "Successfully created user");
        Ok(user)
    }

    #[instrument(
        name = "users_admin.coordinator.update",
        skip(self, draft),
        fields(user_id = %id)
    )]
    pub async fn update(&self, id: UserId, draft: UserDraft) -> Result<User, SyncError> {
        info!("Updating user");
        let guard = self.pending.begin(MutationKind::Update, Some(id)).map_err(|e| {
            debug!("Rejected: {}", e);
            e
        })?;

        let echo = self.remote.update_user(id, &draft).await.map_err(|e| {
            warn!(error = %e, "Remote rejected update");
            SyncError::mutation_failed(MutationKind::Update, Some(id), e)
        })?;

        // local id stays authoritative; echoed ids are ignored
        let patch = draft.into_patch().overlay(echo.fields);
        let applied = self.cache.apply_update(id, patch);
        drop(guard);

        match applied {
            Ok(user) => {
                info!("Successfully updated user");
                Ok(user)
            }
            Err(e) => {
                warn!("Remote accepted update but user is no longer cached");
                Err(e)
            }
        }
    }

    #[instrument(
        name = "users_admin.coordinator.delete",
        skip(self),
        fields(user_id = %id)
    )]
    pub async fn delete(&self, id: UserId) -> Result<User, SyncError> {
        info!("Deleting user");
        let guard = self.pending.begin(MutationKind::Delete, Some(id)).map_err(|e| {
            debug!("Rejected: {}", e);
            e
        })?;

        self.remote.delete_user(id).await.map_err(|e| {
            warn!(error = %e, "Remote rejected delete");
            SyncError::mutation_failed(MutationKind::Delete, Some(id), e)
        })?;

        let applied = self.cache.apply_delete(id);
        drop(guard);

        match applied {
            Ok(user) => {
                info!("Successfully deleted user");
                Ok(user)
            }
            Err(e) => {
                warn!("Remote accepted delete but user is no longer cached");
                Err(e)
            }
        }
    }

    /// Run whatever the editor handed over.
    pub async fn submit(&self, submission: Submission) -> Result<User, SyncError> {
        match submission {
            Submission::Create(draft) => self.create(draft).await,
            Submission::Update { id, draft } => self.update(id, draft).await,
            Submission::Delete { id } => self.delete(id).await,
        }
    }
}
