pub mod dto;
pub mod http;
pub mod traced;

pub use http::HttpUsersRemote;
pub use traced::TracedClient;
