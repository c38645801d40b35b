//! Newtype wrappers for type safety

use serde::{Deserialize, Serialize};

/// Opaque continuation reference for a paginated listing
///
/// Graph returns this as the absolute `@odata.nextLink` URL. Callers treat it
/// as opaque; its absence marks the final page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wrap a continuation reference, treating an empty one as absent
    pub fn new(link: impl Into<String>) -> Option<Self> {
        let link = link.into();
        if link.trim().is_empty() {
            None
        } else {
            Some(Self(link))
        }
    }

    /// Get the cursor as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PageCursor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cursor_is_absent() {
        assert!(PageCursor::new("").is_none());
        assert!(PageCursor::new("   ").is_none());
    }

    #[test]
    fn test_cursor_round_trip() {
        let link = "https://graph.microsoft.com/v1.0/users?$skiptoken=X2";
        let cursor = PageCursor::new(link).unwrap();
        assert_eq!(cursor.as_str(), link);
        assert_eq!(cursor.to_string(), link);

        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, format!("\"{link}\""));
    }
}
