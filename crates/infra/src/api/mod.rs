//! Control-plane API access
//!
//! - [`client`]: authenticated JSON client with timeout and retry policy
//! - [`remote_jobs`]: bulk job endpoints behind the core `RemoteJobService`
//!   port
//! - [`auth`]: bearer token supply

pub mod auth;
pub mod client;
pub mod errors;
pub mod remote_jobs;

pub use auth::{AccessTokenProvider, StaticTokenProvider};
pub use client::{ApiClient, ApiClientConfig};
pub use errors::{ApiError, ApiErrorCategory};
pub use remote_jobs::HttpRemoteJobService;
