// === PUBLIC CONTRACT ===
// The data model, the remote client port and its error type.
pub mod contract;

pub use contract::{client, error, model};

// === SESSION CORE ===
pub mod config;
pub mod domain;
pub mod infra;

pub use config::UsersAdminConfig;
pub use domain::session::UsersSession;
