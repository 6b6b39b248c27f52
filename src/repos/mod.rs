pub mod client;
pub mod dto;
pub mod error;
pub mod post_repo;
pub mod post_stream;
pub mod user_repo;

pub use client::ApiClient;
pub use error::{RepoError, RepoResult};
