pub mod client;
pub mod error;
pub mod model;

pub use client::UsersRemote;
pub use error::RemoteError;
pub use model::{Company, RemoteUser, User, UserDraft, UserId, UserPatch};
