//! Device authorization responses and sessions

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{GraphError, Result};
use crate::utils::{parse_positive_secs, string_or_number, truncate_body};

/// Poll interval used when the server omits or mis-reports one
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Session lifetime used when the server omits or mis-reports one
pub const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(900);

/// Upper bound for the poll interval, both as reported and after
/// `slow_down` responses
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Longest session accepted from the server; larger values are clamped
pub const MAX_SESSION_LIFETIME: Duration = Duration::from_secs(60 * 60);

/// Raw device authorization response.
///
/// v1.0 endpoints name the verification link `verification_url`, v2.0 and
/// RFC 8628 use `verification_uri`. Both are accepted here and collapsed into
/// [`DeviceCodeSession::verification_url`].
#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    #[serde(default)]
    verification_url: Option<String>,
    #[serde(default)]
    verification_uri: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    expires_in: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    interval: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// One device-code sign-in attempt
///
/// Lives only for the duration of a single authentication attempt and is
/// never persisted. The device code itself is kept private and redacted from
/// `Debug` output.
#[derive(Clone)]
pub struct DeviceCodeSession {
    device_code: String,
    /// Code the user types at the verification page
    pub user_code: String,
    /// Page where the user enters the code
    pub verification_url: String,
    /// Human readable instructions from the provider
    pub message: Option<String>,
    /// Interval between redemption attempts
    pub poll_interval: Duration,
    /// Wall-clock expiry of the session
    pub expires_at: DateTime<Utc>,
    deadline: Instant,
}

impl std::fmt::Debug for DeviceCodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCodeSession")
            .field("device_code", &"<redacted>")
            .field("user_code", &self.user_code)
            .field("verification_url", &self.verification_url)
            .field("poll_interval", &self.poll_interval)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl DeviceCodeSession {
    /// Parse a device authorization response body
    ///
    /// `min_poll_interval` is the floor applied to the server's interval.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::FlowStart`] if the body is not a usable device
    /// authorization response.
    pub fn from_response(body: &[u8], min_poll_interval: Duration) -> Result<Self> {
        let response: DeviceCodeResponse = serde_json::from_slice(body).map_err(|e| {
            GraphError::flow_start(format!(
                "malformed device-code response: {e} (body: {})",
                truncate_body(body)
            ))
        })?;

        let verification_url = response
            .verification_url
            .filter(|u| !u.is_empty())
            .or(response.verification_uri.filter(|u| !u.is_empty()))
            .ok_or_else(|| GraphError::flow_start("device-code response has no verification URL"))?;

        if response.device_code.is_empty() || response.user_code.is_empty() {
            return Err(GraphError::flow_start(
                "device-code response has an empty device or user code",
            ));
        }

        // An interval beyond the cap is treated as mis-reported
        let poll_interval = parse_positive_secs(response.interval.as_deref())
            .map(Duration::from_secs)
            .filter(|interval| *interval <= MAX_POLL_INTERVAL)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
            .max(min_poll_interval);
        let lifetime = parse_positive_secs(response.expires_in.as_deref())
            .map(|secs| Duration::from_secs(secs).min(MAX_SESSION_LIFETIME))
            .unwrap_or(DEFAULT_SESSION_LIFETIME);

        let deadline = Instant::now()
            .checked_add(lifetime)
            .ok_or_else(|| GraphError::flow_start("device-code session lifetime overflows the clock"))?;
        let expires_at = chrono::Duration::from_std(lifetime)
            .ok()
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| GraphError::flow_start("device-code session lifetime overflows the clock"))?;

        Ok(Self {
            device_code: response.device_code,
            user_code: response.user_code,
            verification_url,
            message: response.message,
            poll_interval,
            expires_at,
            deadline,
        })
    }

    /// Secret device code sent back when redeeming
    pub(crate) fn device_code(&self) -> &str {
        &self.device_code
    }

    /// Monotonic deadline after which polling stops
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// True once the deadline has passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

/// Next poll interval after a `slow_down` response
#[must_use]
pub fn slowed_interval(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_POLL_INTERVAL)
}
