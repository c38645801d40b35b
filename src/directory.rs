//! Typed directory enumeration on top of [`GraphClient`]
//!
//! Listing calls decode each record independently. A record that does not
//! fit the expected shape is skipped and logged at `debug`, so one odd object
//! never hides the rest of a listing.

use serde::de::DeserializeOwned;

use crate::client::GraphClient;
use crate::error::{PageError, Result};
use crate::types::{DirectoryRole, GLOBAL_ADMIN_ROLE_NAME, RoleMember, RoleWithMembers, User};

const USERS_PATH: &str = "/users?$select=id,displayName,userPrincipalName,mail,jobTitle,department,accountEnabled&$top=999";
const ROLES_PATH: &str = "/directoryRoles";

fn decode_records<T: DeserializeOwned>(records: Vec<serde_json::Value>, kind: &str) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(kind, "Skipping undecodable record: {e}");
                None
            }
        })
        .collect()
}

fn role_members_path(role_id: &str) -> String {
    format!("{ROLES_PATH}/{}/members", urlencoding::encode(role_id))
}

impl GraphClient {
    /// Profile of the signed-in user
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the body is not a user record.
    pub async fn me(&self) -> Result<User> {
        self.get_json("/me").await
    }

    /// List directory users, stopping after `max_results` when given
    ///
    /// # Errors
    ///
    /// Returns a [`PageError`] whose records hold the raw entries fetched
    /// before the failure.
    pub async fn list_users(
        &self,
        max_results: Option<usize>,
    ) -> std::result::Result<Vec<User>, PageError> {
        let records = self.get_all_pages(USERS_PATH, max_results).await?;
        Ok(decode_records(records, "user"))
    }

    /// List activated directory roles
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered while paging.
    pub async fn list_directory_roles(&self) -> Result<Vec<DirectoryRole>> {
        let records = self.get_all_pages(ROLES_PATH, None).await?;
        Ok(decode_records(records, "directoryRole"))
    }

    /// List the members of one directory role
    ///
    /// # Errors
    ///
    /// Returns the first failure encountered while paging.
    pub async fn role_members(&self, role_id: &str) -> Result<Vec<RoleMember>> {
        let records = self.get_all_pages(&role_members_path(role_id), None).await?;
        Ok(decode_records(records, "roleMember"))
    }

    /// The Global Administrator role and its members
    ///
    /// Returns `None` when the role has not been activated in the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if either listing fails.
    pub async fn global_admins(&self) -> Result<Option<RoleWithMembers>> {
        let roles = self.list_directory_roles().await?;
        let Some(role) = roles
            .into_iter()
            .find(|r| r.display_name == GLOBAL_ADMIN_ROLE_NAME)
        else {
            tracing::debug!("Global Administrator role is not activated");
            return Ok(None);
        };

        let members = self.role_members(&role.id).await?;
        Ok(Some(RoleWithMembers { role, members }))
    }

    /// Every activated role with its members
    ///
    /// Roles whose member listing fails are logged and left out.
    ///
    /// # Errors
    ///
    /// Returns an error only if the role listing itself fails.
    pub async fn roles_with_members(&self) -> Result<Vec<RoleWithMembers>> {
        let roles = self.list_directory_roles().await?;
        let mut out = Vec::with_capacity(roles.len());

        for role in roles {
            match self.role_members(&role.id).await {
                Ok(members) => out.push(RoleWithMembers { role, members }),
                Err(e) => {
                    tracing::warn!(role = %role.display_name, "Skipping role: {e}");
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_skips_bad_records() {
        let users: Vec<User> = decode_records(
            vec![
                json!({"id": "u1", "displayName": "Adele"}),
                json!("not an object"),
                json!({"id": "u2", "accountEnabled": "yes"}),
                json!({"id": "u3"}),
            ],
            "user",
        );
        let ids: Vec<_> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["u1", "u3"]);
    }

    #[test]
    fn test_role_members_path_escapes_id() {
        assert_eq!(role_members_path("abc-123"), "/directoryRoles/abc-123/members");
        assert_eq!(role_members_path("a/b"), "/directoryRoles/a%2Fb/members");
        assert_eq!(
            role_members_path("r 1?x=#y"),
            "/directoryRoles/r%201%3Fx%3D%23y/members"
        );
    }
}
