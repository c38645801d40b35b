//! # Graph Device SDK for Rust
//!
//! Device-code sign-in and rate-limited, paginated access to Microsoft Graph.
//! Async/await, strong typing, tokio-based.
//!
//! ## Quick Start
//!
//! ```no_run
//! use graph_device_sdk::{CredentialManager, GraphClient, GraphOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = GraphOptions::from_env();
//!     let manager = CredentialManager::new(options.clone())?;
//!
//!     // Reuses a cached token, refreshes it, or runs the device-code flow
//!     let token = manager.access_token().await?;
//!
//!     let client = GraphClient::new(token, &options)?;
//!     let users = client.list_users(Some(100)).await?;
//!     println!("{} users", users.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Core Features
//!
//! ### 1. Credentials with [`CredentialManager`]
//!
//! One credential record lives in `<output dir>/tokens.json` (mode 600).
//! [`CredentialManager::access_token`] returns it while it has more than five
//! minutes left, refreshes it when it carries a refresh token, and otherwise
//! prints a user code and polls the token endpoint until the user approves.
//!
//! ```no_run
//! # use graph_device_sdk::{CredentialManager, GraphOptions};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = GraphOptions::builder()
//!     .client_id("00000000-0000-0000-0000-000000000000")
//!     .build()
//!     .with_tenant("contoso.onmicrosoft.com");
//!
//! let manager = CredentialManager::new(options)?;
//! if !manager.is_authenticated() {
//!     manager.access_token().await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### 2. Paged API Calls with [`GraphClient`]
//!
//! [`GraphClient::get_all_pages`] follows `@odata.nextLink`, waits a fixed
//! delay before each follow-up page, and hands back partial results on
//! failure through [`PageError`].
//!
//! ## Architecture
//!
//! - [`auth`]: Credential record, store, device-code flow and refresh
//! - [`client`]: Bearer-authenticated requests and pagination
//! - [`directory`]: Typed user and role enumeration
//! - [`transport`]: HTTP seam; swap in a scripted transport for tests
//! - [`types`]: Options, directory records, identifiers
//! - [`error`]: Error types and handling
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing) for structured logging.
//! Tracing events are always emitted but are zero-cost when no subscriber is attached.
//! To see logs, attach a tracing subscriber in your application:
//!
//! ```rust,ignore
//! tracing_subscriber::fmt::init();
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, GraphError>`](Result). Every
//! variant names the phase it failed in:
//!
//! ```no_run
//! # use graph_device_sdk::{CredentialManager, GraphError, GraphOptions};
//! # async fn example(manager: CredentialManager) {
//! match manager.access_token().await {
//!     Ok(token) => { /* ... */ }
//!     Err(GraphError::AuthorizationExpired { waited_secs }) => {
//!         eprintln!("Nobody approved the sign-in within {waited_secs}s");
//!     }
//!     Err(e) => {
//!         eprintln!("Error: {}", e);
//!     }
//! }
//! # }
//! ```
//!
//! ## Security
//!
//! - **Owner-only credential file** - Written atomically with mode 600
//! - **Redacted secrets** - Device codes and tokens are kept out of `Debug` output and logs
//! - **Bounded error bodies** - Response bodies in errors are cut to 200 characters

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod client;
pub mod directory;
pub mod error;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use auth::{
    CodePresenter, ConsolePresenter, Credential, CredentialManager, CredentialManagerBuilder,
    CredentialStore, DeviceCodeSession,
};
pub use client::GraphClient;
pub use error::{GraphError, PageError, Phase, Result};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use types::{
    DirectoryRole, GrantAudience, GraphOptions, GraphOptionsBuilder, PageCursor, RoleMember,
    RoleWithMembers, User,
};

/// Version of the SDK
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
