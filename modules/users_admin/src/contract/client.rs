use async_trait::async_trait;

use crate::contract::{
    error::RemoteError,
    model::{RemoteUser, User, UserDraft, UserId},
};

/// Port to the remote user directory. Stateless request/response calls;
/// implementations never touch the local cache.
#[async_trait]
pub trait UsersRemote: Send + Sync {
    /// Fetch the whole collection
    async fn list_users(&self) -> Result<Vec<User>, RemoteError>;

    /// Create a user; the echo may or may not carry a usable id
    async fn create_user(&self, draft: &UserDraft) -> Result<RemoteUser, RemoteError>;

    /// Replace a user's editable fields
    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<RemoteUser, RemoteError>;

    /// Delete a user by ID
    async fn delete_user(&self, id: UserId) -> Result<(), RemoteError>;
}
