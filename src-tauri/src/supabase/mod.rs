pub mod auth;
pub mod rest;
pub mod types;
pub mod vault;

pub use auth::{AuthClient, AuthProvider};
pub use rest::RestClient;
pub use types::{Session, SignUpOutcome, User};
pub use vault::KeychainVault;

use std::time::Duration;

const USER_AGENT: &str = "CKStyle/1.0";

/// Shared HTTP client for both hosted services.
pub fn http_client() -> crate::error::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()?)
}
