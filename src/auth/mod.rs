//! Device-code authentication for Microsoft identity platform
//!
//! Implements the OAuth 2.0 Device Authorization Grant (RFC 8628) plus
//! refresh-token exchange, with a single on-disk credential record.
//!
//! # Overview
//!
//! [`CredentialManager::access_token`] resolves a bearer token as follows:
//!
//! 1. Reuse the cached credential if it is valid for more than 5 minutes
//! 2. Otherwise refresh it, if it carries a refresh token
//! 3. Otherwise (or if refresh fails) run the device-code flow:
//!    request a code, show it to the user, poll until approved
//! 4. Persist the new credential for future runs
//!
//! # Example
//!
//! ```no_run
//! use graph_device_sdk::auth::CredentialManager;
//! use graph_device_sdk::GraphOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = CredentialManager::new(GraphOptions::from_env())?;
//!     let token = manager.access_token().await?;
//!     println!("Got a token of {} bytes", token.len());
//!     Ok(())
//! }
//! ```
//!
//! # Security
//!
//! - The credential file is created with user-only permissions (600)
//! - Device codes never leave memory and are redacted from `Debug` output
//! - The record is replaced atomically (write temp file, then rename)

mod credential;
mod device_code;
mod manager;
mod presenter;
mod store;

pub use credential::{
    Credential, DEFAULT_LIFETIME, EXPIRY_SKEW, MAX_LIFETIME, compute_expires_at, is_valid,
};
pub use device_code::{
    DEFAULT_POLL_INTERVAL, DEFAULT_SESSION_LIFETIME, DeviceCodeSession, MAX_POLL_INTERVAL,
    MAX_SESSION_LIFETIME, slowed_interval,
};
pub use manager::{CredentialManager, CredentialManagerBuilder};
pub use presenter::{CodePresenter, ConsolePresenter};
pub use store::{CREDENTIAL_FILE_NAME, CredentialStore, StoreError};
