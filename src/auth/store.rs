//! Single-record credential storage

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::credential::Credential;

/// File name of the persisted credential inside the output directory
pub const CREDENTIAL_FILE_NAME: &str = "tokens.json";

/// Errors that can occur during credential storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// No credential has been stored
    #[error("Credential not found")]
    NotFound,

    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Credential store holding one record in one file
///
/// Writes go to a sibling temporary file that is renamed into place, so a
/// reader never sees a partially written record.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store for `<output_dir>/tokens.json`
    #[must_use]
    pub fn in_dir(output_dir: impl AsRef<Path>) -> Self {
        Self {
            path: output_dir.as_ref().join(CREDENTIAL_FILE_NAME),
        }
    }

    /// Store at an explicit file path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no record exists,
    /// or I/O and JSON errors if reading fails.
    pub fn load(&self) -> Result<Credential, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Save the credential, replacing any existing record
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or serialization fails.
    pub fn save(&self, credential: &Credential) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(credential)?;
        let tmp_path = self.path.with_extension("json.tmp");

        let mut file = open_owner_only(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Delete the stored credential
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be deleted.
    pub fn delete(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Check whether a record exists
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }
}

#[cfg(unix)]
fn open_owner_only(path: &Path) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation; a leftover temp file keeps its old bits
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_owner_only(path: &Path) -> std::io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn sample() -> Credential {
        Credential {
            access_token: "test_access".to_string(),
            refresh_token: Some("test_refresh".to_string()),
            token_type: "Bearer".to_string(),
            expires_in: Some("3599".to_string()),
            expires_on: Some("1700003599".to_string()),
            resource: Some("https://graph.microsoft.com".to_string()),
            scope: None,
            expires_at: Utc.timestamp_opt(1_700_003_599, 0).unwrap(),
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp_dir.path());

        let credential = sample();
        store.save(&credential).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.access_token, credential.access_token);
        assert_eq!(loaded.refresh_token, credential.refresh_token);
        assert_eq!(loaded.expires_at, credential.expires_at);
        assert_eq!(loaded, credential);
    }

    #[test]
    fn test_record_fields_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp_dir.path());
        store.save(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        for field in [
            "access_token",
            "refresh_token",
            "token_type",
            "expires_in",
            "expires_on",
            "expires_at",
        ] {
            assert!(raw.get(field).is_some(), "missing {field}");
        }
        assert!(!temp_dir.path().join("tokens.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp_dir.path().join("nested"));
        store.save(&sample()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_path(temp_dir.path().join("nonexistent.json"));
        assert!(matches!(store.load(), Err(StoreError::NotFound)));
        assert!(!store.exists());
    }

    #[test]
    fn test_malformed_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp_dir.path());
        std::fs::write(store.path(), "{\"access_token\": ").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::in_dir(temp_dir.path());
        store.delete().unwrap();

        store.save(&sample()).unwrap();
        assert!(store.exists());
        store.delete().unwrap();
        assert!(!store.exists());
    }
}
