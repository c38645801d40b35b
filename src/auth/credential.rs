//! Credential model, expiry computation and token endpoint responses

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{GraphError, Phase, Result};
use crate::utils::{parse_positive_secs, string_or_number};

/// Safety margin subtracted from the provider's expiry
pub const EXPIRY_SKEW: Duration = Duration::from_secs(5 * 60);

/// Lifetime assumed when the provider reports no expiry at all
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Longest lifetime accepted from the provider; larger values are clamped
pub const MAX_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// OAuth credential obtained from the token endpoint
///
/// `expires_at` is always computed when the credential is issued or
/// refreshed; the raw `expires_in` / `expires_on` values are kept as the
/// provider sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API calls
    pub access_token: String,

    /// Refresh token for obtaining new access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Relative lifetime in seconds, as reported
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub expires_in: Option<String>,

    /// Absolute Unix expiry, as reported
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "string_or_number"
    )]
    pub expires_on: Option<String>,

    /// Resource the token was issued for (v1.0 endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Scopes granted (v2.0 endpoints)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Computed absolute expiry
    pub expires_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl Credential {
    /// Check validity at `now`, honoring [`EXPIRY_SKEW`]
    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_valid(self, now)
    }

    /// Check validity against the current time
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Get the Authorization header value
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Resource or scope the credential was issued for
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.resource.as_deref().or(self.scope.as_deref())
    }

    /// Time left before the provider's expiry, if any
    #[must_use]
    pub fn remaining_validity(&self) -> Option<Duration> {
        (self.expires_at - Utc::now()).to_std().ok()
    }
}

/// True iff `now < expires_at - EXPIRY_SKEW`
#[must_use]
pub fn is_valid(credential: &Credential, now: DateTime<Utc>) -> bool {
    let skew = ChronoDuration::from_std(EXPIRY_SKEW).unwrap_or_else(|_| ChronoDuration::zero());
    credential
        .expires_at
        .checked_sub_signed(skew)
        .is_some_and(|usable_until| now < usable_until)
}

/// Compute the absolute expiry from the provider's fields.
///
/// An absolute `expires_on` wins over a relative `expires_in`; with neither,
/// [`DEFAULT_LIFETIME`] applies. The result never lies more than
/// [`MAX_LIFETIME`] after `now`.
#[must_use]
pub fn compute_expires_at(
    expires_on: Option<&str>,
    expires_in: Option<&str>,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let latest = after(now, MAX_LIFETIME);

    if let Some(absolute) = expires_on
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    {
        return absolute.min(latest);
    }

    let lifetime = parse_positive_secs(expires_in)
        .map(|secs| Duration::from_secs(secs).min(MAX_LIFETIME))
        .unwrap_or(DEFAULT_LIFETIME);
    after(now, lifetime)
}

/// `now + lifetime`, saturating instead of overflowing
fn after(now: DateTime<Utc>, lifetime: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Token endpoint response: either a credential or an OAuth error
#[derive(Debug, Default, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub expires_in: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub expires_on: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// Parse a token endpoint body
    pub(crate) fn parse(body: &[u8], phase: Phase) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            GraphError::protocol(
                phase,
                format!(
                    "cannot parse token response: {e} (body: {})",
                    crate::utils::truncate_body(body)
                ),
            )
        })
    }

    /// OAuth error code and description, if the response carries one
    pub(crate) fn oauth_error(&self) -> Option<(String, String)> {
        let code = self.error.as_deref().filter(|c| !c.is_empty())?;
        Some((
            code.to_string(),
            self.error_description.clone().unwrap_or_default(),
        ))
    }

    /// Build a credential issued at `now`, if an access token is present
    pub(crate) fn into_credential(self, now: DateTime<Utc>) -> Option<Credential> {
        let access_token = self.access_token.filter(|t| !t.is_empty())?;
        let expires_at =
            compute_expires_at(self.expires_on.as_deref(), self.expires_in.as_deref(), now);
        Some(Credential {
            access_token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            token_type: self
                .token_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(default_token_type),
            expires_in: self.expires_in,
            expires_on: self.expires_on,
            resource: self.resource,
            scope: self.scope,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential_expiring_at(expires_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: "access".to_string(),
            refresh_token: None,
            token_type: "Bearer".to_string(),
            expires_in: None,
            expires_on: None,
            resource: None,
            scope: None,
            expires_at,
        }
    }

    #[test]
    fn test_valid_outside_skew_window() {
        let now = Utc::now();
        for minutes in [6, 30, 60, 24 * 60] {
            let credential = credential_expiring_at(now + ChronoDuration::minutes(minutes));
            assert!(is_valid(&credential, now), "{minutes} minutes out");
        }
    }

    #[test]
    fn test_invalid_inside_or_past_skew_window() {
        let now = Utc::now();
        for seconds in [300, 299, 60, 0, -1, -3600] {
            let credential = credential_expiring_at(now + ChronoDuration::seconds(seconds));
            assert!(!is_valid(&credential, now), "{seconds} seconds out");
        }
        let credential = credential_expiring_at(now + ChronoDuration::seconds(301));
        assert!(is_valid(&credential, now));
    }

    #[test]
    fn test_absolute_expiry_takes_precedence() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let expires_at = compute_expires_at(Some("1700007200"), Some("60"), now);
        assert_eq!(expires_at.timestamp(), 1_700_007_200);
    }

    #[test]
    fn test_relative_expiry() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let expires_at = compute_expires_at(None, Some("3599"), now);
        assert_eq!(expires_at.timestamp(), 1_700_003_599);

        // Unparseable absolute value falls back to the relative one
        let expires_at = compute_expires_at(Some("tomorrow"), Some("10"), now);
        assert_eq!(expires_at.timestamp(), 1_700_000_010);
    }

    #[test]
    fn test_default_lifetime() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(compute_expires_at(None, None, now).timestamp(), 1_700_003_600);
        assert_eq!(
            compute_expires_at(None, Some("0"), now).timestamp(),
            1_700_003_600
        );
    }

    #[test]
    fn test_huge_relative_expiry_is_clamped() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let cap = ChronoDuration::from_std(MAX_LIFETIME).unwrap();

        for expires_in in ["9000000000000", "18446744073709551615"] {
            let expires_at = compute_expires_at(None, Some(expires_in), now);
            assert_eq!(expires_at, now + cap, "{expires_in}");
        }
        // Beyond u64 does not parse and falls back to the default
        let expires_at = compute_expires_at(None, Some("99999999999999999999999"), now);
        assert_eq!(expires_at.timestamp(), 1_700_003_600);
    }

    #[test]
    fn test_far_future_absolute_expiry_is_clamped() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let cap = ChronoDuration::from_std(MAX_LIFETIME).unwrap();
        let expires_at = compute_expires_at(Some("32503680000"), None, now);
        assert_eq!(expires_at, now + cap);
    }

    #[test]
    fn test_expiry_at_the_end_of_time_does_not_panic() {
        let credential = credential_expiring_at(DateTime::<Utc>::MIN_UTC);
        assert!(!is_valid(&credential, Utc::now()));

        let end = DateTime::<Utc>::MAX_UTC;
        assert_eq!(after(end, Duration::from_secs(60)), end);
    }

    #[test]
    fn test_token_response_v1_string_fields() {
        let body = br#"{
            "token_type": "Bearer",
            "expires_in": "3599",
            "expires_on": "1700003599",
            "resource": "https://graph.microsoft.com",
            "access_token": "eyJ0eXAi",
            "refresh_token": "0.AXoA"
        }"#;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let credential = TokenResponse::parse(body, Phase::Polling)
            .unwrap()
            .into_credential(now)
            .unwrap();

        assert_eq!(credential.access_token, "eyJ0eXAi");
        assert_eq!(credential.refresh_token.as_deref(), Some("0.AXoA"));
        assert_eq!(credential.expires_at.timestamp(), 1_700_003_599);
        assert_eq!(credential.audience(), Some("https://graph.microsoft.com"));
    }

    #[test]
    fn test_token_response_v2_numeric_fields() {
        let body = br#"{"token_type":"Bearer","scope":"User.Read","expires_in":3600,"access_token":"at"}"#;
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let credential = TokenResponse::parse(body, Phase::Refresh)
            .unwrap()
            .into_credential(now)
            .unwrap();

        assert_eq!(credential.expires_in.as_deref(), Some("3600"));
        assert_eq!(credential.expires_at.timestamp(), 1_700_003_600);
        assert_eq!(credential.refresh_token, None);
    }

    #[test]
    fn test_token_response_error() {
        let body = br#"{"error":"authorization_pending","error_description":"AADSTS70016: pending"}"#;
        let response = TokenResponse::parse(body, Phase::Polling).unwrap();
        let (code, description) = response.oauth_error().unwrap();
        assert_eq!(code, "authorization_pending");
        assert!(description.starts_with("AADSTS70016"));
        assert!(response.into_credential(Utc::now()).is_none());
    }

    #[test]
    fn test_token_response_garbage_is_protocol_error() {
        let err = TokenResponse::parse(b"<html>oops</html>", Phase::Refresh).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Protocol {
                phase: Phase::Refresh,
                ..
            }
        ));
    }

    #[test]
    fn test_authorization_header() {
        let credential = credential_expiring_at(Utc::now());
        assert_eq!(credential.authorization_header(), "Bearer access");
    }
}
