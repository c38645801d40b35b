//! Utility functions for the Graph device SDK
//!
//! String handling that respects UTF-8 boundaries and lenient decoding of
//! numeric fields that identity providers return either as JSON strings or
//! as numbers.

use serde::{Deserialize, Deserializer};

/// Maximum number of characters of a response body kept in an error.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// Truncate a string to at most `max_chars` characters.
///
/// # Example
/// ```
/// use graph_device_sdk::utils::truncate_chars;
///
/// assert_eq!(truncate_chars("Café au lait", 4), "Café");
/// assert_eq!(truncate_chars("short", 100), "short");
/// ```
#[inline]
#[must_use]
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((boundary, _)) => &s[..boundary],
        None => s,
    }
}

/// Render a response body for inclusion in an error message.
///
/// Invalid UTF-8 is replaced, and anything beyond [`MAX_ERROR_BODY_CHARS`]
/// characters is cut off with a trailing `...`.
///
/// # Example
/// ```
/// use graph_device_sdk::utils::truncate_body;
///
/// let body = "x".repeat(500);
/// let rendered = truncate_body(body.as_bytes());
/// assert_eq!(rendered.len(), 203);
/// assert!(rendered.ends_with("..."));
/// ```
#[must_use]
pub fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let truncated = truncate_chars(&text, MAX_ERROR_BODY_CHARS);
    if truncated.len() < text.len() {
        format!("{truncated}...")
    } else {
        truncated.to_string()
    }
}

/// Shorten a secret for logging: keeps a short prefix only.
#[must_use]
pub fn redact(secret: &str) -> String {
    if secret.chars().count() <= 8 {
        return "***".to_string();
    }
    format!("{}...", truncate_chars(secret, 6))
}

/// Parse a strictly positive number of seconds, ignoring garbage.
#[must_use]
pub fn parse_positive_secs(value: Option<&str>) -> Option<u64> {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
}

/// Deserialize an optional field that may be a JSON string or number into
/// its string form.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    #[allow(clippy::cast_possible_truncation)]
    let value = Option::<Lenient>::deserialize(deserializer)?.map(|v| match v {
        Lenient::Text(s) => s,
        Lenient::Unsigned(n) => n.to_string(),
        Lenient::Signed(n) => n.to_string(),
        Lenient::Float(f) => (f.trunc() as i64).to_string(),
    });
    Ok(value)
}
