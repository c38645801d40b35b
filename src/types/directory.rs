//! Directory record types returned by Microsoft Graph

use serde::{Deserialize, Serialize};

/// Display name of the built-in Global Administrator role
pub const GLOBAL_ADMIN_ROLE_NAME: &str = "Global Administrator";

const SERVICE_PRINCIPAL_ODATA_TYPE: &str = "#microsoft.graph.servicePrincipal";

/// Directory user account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Object ID
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sign-in name
    #[serde(default)]
    pub user_principal_name: Option<String>,
    /// Primary SMTP address
    #[serde(default)]
    pub mail: Option<String>,
    /// Job title
    #[serde(default)]
    pub job_title: Option<String>,
    /// Department
    #[serde(default)]
    pub department: Option<String>,
    /// Whether sign-in is enabled
    #[serde(default)]
    pub account_enabled: Option<bool>,
}

/// Activated directory role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryRole {
    /// Object ID
    pub id: String,
    /// Display name, e.g. "Global Administrator"
    #[serde(default)]
    pub display_name: String,
    /// Role description
    #[serde(default)]
    pub description: Option<String>,
    /// ID of the role template this role was activated from
    #[serde(default)]
    pub role_template_id: Option<String>,
}

/// Member of a directory role (user or service principal)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleMember {
    /// Object ID
    pub id: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Sign-in name (absent for service principals)
    #[serde(default)]
    pub user_principal_name: Option<String>,
    /// Graph object type
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
}

impl RoleMember {
    /// True when the member is a service principal rather than a user
    #[must_use]
    pub fn is_service_principal(&self) -> bool {
        self.odata_type.as_deref() == Some(SERVICE_PRINCIPAL_ODATA_TYPE)
            || self
                .user_principal_name
                .as_deref()
                .is_none_or(str::is_empty)
    }
}

/// Directory role together with its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleWithMembers {
    /// The role
    pub role: DirectoryRole,
    /// Its members
    pub members: Vec<RoleMember>,
}
