//! Type definitions for the Graph device SDK
//!
//! Configuration options, identifier newtypes and the directory records
//! returned by the Graph client.

pub mod directory;
pub mod identifiers;
pub mod options;

pub use directory::{DirectoryRole, GLOBAL_ADMIN_ROLE_NAME, RoleMember, RoleWithMembers, User};
pub use identifiers::PageCursor;
pub use options::{GrantAudience, GraphOptions, GraphOptionsBuilder};
