pub mod memory;
pub mod remote;

pub use memory::InMemoryUsersRemote;
pub use remote::{HttpUsersRemote, TracedClient};
