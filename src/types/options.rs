//! Client configuration options

use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;

// ============================================================================
// Defaults
// ============================================================================

/// Public client ID of the Azure CLI, registered for device-code sign-in
pub const DEFAULT_CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

/// v1.0 device authorization endpoint (resource-based)
pub const DEFAULT_DEVICE_CODE_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/devicecode?api-version=1.0";

/// v1.0 token endpoint (resource-based)
pub const DEFAULT_TOKEN_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/token?api-version=1.0";

/// v2.0 device authorization endpoint (scope-based)
pub const V2_DEVICE_CODE_URL: &str =
    "https://login.microsoftonline.com/common/oauth2/v2.0/devicecode";

/// v2.0 token endpoint (scope-based)
pub const V2_TOKEN_URL: &str = "https://login.microsoftonline.com/common/oauth2/v2.0/token";

/// Resource identifier for Microsoft Graph
pub const GRAPH_RESOURCE: &str = "https://graph.microsoft.com";

/// Base URL for Microsoft Graph v1.0 endpoints
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Base URL for Microsoft Graph beta endpoints
pub const GRAPH_BETA_URL: &str = "https://graph.microsoft.com/beta";

/// Identifying user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("graph-device-sdk/", env!("CARGO_PKG_VERSION"));

/// Default timeout for a single HTTP exchange
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Delay before each follow-up page request
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

/// Lowest poll interval the device-code loop will use
pub const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Environment variable overriding the client ID
pub const ENV_CLIENT_ID: &str = "GRAPH_DEVICE_CLIENT_ID";
/// Environment variable selecting a tenant instead of `common`
pub const ENV_TENANT: &str = "GRAPH_DEVICE_TENANT";
/// Environment variable overriding the output directory
pub const ENV_OUTPUT_DIR: &str = "GRAPH_DEVICE_OUTPUT_DIR";
/// Environment variable overriding the API base URL
pub const ENV_API_BASE_URL: &str = "GRAPH_DEVICE_API_BASE_URL";

fn default_output_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("graph-device-sdk")
}

// ============================================================================
// Grant Audience
// ============================================================================

/// What the credential is requested for
///
/// The v1.0 endpoints take a `resource` and redeem the device code under the
/// `code` parameter; the v2.0 endpoints take a space-separated `scope` and use
/// `device_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantAudience {
    /// v1.0 resource identifier
    Resource(String),
    /// v2.0 scope list
    Scope(String),
}

impl Default for GrantAudience {
    fn default() -> Self {
        Self::Resource(GRAPH_RESOURCE.to_string())
    }
}

impl GrantAudience {
    /// Form parameter carrying the audience
    #[must_use]
    pub fn param(&self) -> (&'static str, &str) {
        match self {
            Self::Resource(resource) => ("resource", resource.as_str()),
            Self::Scope(scope) => ("scope", scope.as_str()),
        }
    }

    /// Form parameter name used to redeem the device code
    #[must_use]
    pub fn device_code_param(&self) -> &'static str {
        match self {
            Self::Resource(_) => "code",
            Self::Scope(_) => "device_code",
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Configuration shared by the credential manager and the Graph client
///
/// Passed explicitly to constructors; the SDK keeps no process-wide state.
///
/// # Example
///
/// ```
/// use graph_device_sdk::GraphOptions;
/// use std::time::Duration;
///
/// let options = GraphOptions::builder()
///     .output_dir("/tmp/graph-out")
///     .page_delay(Duration::from_millis(250))
///     .build();
/// assert!(options.token_url.contains("/common/"));
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for GraphOptions"),
    builder_type(doc = "Builder for GraphOptions", vis = "pub")
)]
pub struct GraphOptions {
    /// OAuth client ID
    #[builder(default = DEFAULT_CLIENT_ID.to_string(), setter(into))]
    pub client_id: String,

    /// Resource or scope requested for the credential
    #[builder(default)]
    pub audience: GrantAudience,

    /// Device authorization endpoint
    #[builder(default = DEFAULT_DEVICE_CODE_URL.to_string(), setter(into))]
    pub device_code_url: String,

    /// Token endpoint used for redemption and refresh
    #[builder(default = DEFAULT_TOKEN_URL.to_string(), setter(into))]
    pub token_url: String,

    /// Base URL prepended to API paths
    #[builder(default = GRAPH_BASE_URL.to_string(), setter(into))]
    pub api_base_url: String,

    /// User agent sent with every request
    #[builder(default = DEFAULT_USER_AGENT.to_string(), setter(into))]
    pub user_agent: String,

    /// Timeout for a single HTTP exchange
    #[builder(default = DEFAULT_HTTP_TIMEOUT)]
    pub http_timeout: Duration,

    /// Delay before each follow-up page request
    #[builder(default = DEFAULT_PAGE_DELAY)]
    pub page_delay: Duration,

    /// Floor applied to the server-suggested poll interval
    #[builder(default = DEFAULT_MIN_POLL_INTERVAL)]
    pub min_poll_interval: Duration,

    /// Directory holding the persisted credential
    #[builder(default = default_output_dir(), setter(into))]
    pub output_dir: PathBuf,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GraphOptions {
    /// Options for the scope-based v2.0 endpoints
    #[must_use]
    pub fn scope_based(scope: impl Into<String>) -> Self {
        Self::builder()
            .audience(GrantAudience::Scope(scope.into()))
            .device_code_url(V2_DEVICE_CODE_URL)
            .token_url(V2_TOKEN_URL)
            .build()
    }

    /// Point the login endpoints at a specific tenant instead of `common`
    #[must_use]
    pub fn with_tenant(mut self, tenant: &str) -> Self {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return self;
        }
        self.device_code_url = replace_tenant(&self.device_code_url, tenant);
        self.token_url = replace_tenant(&self.token_url, tenant);
        self
    }

    /// Defaults overlaid with `GRAPH_DEVICE_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (environment or otherwise)
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(client_id) = lookup(ENV_CLIENT_ID) {
            self.client_id = client_id;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(base) = lookup(ENV_API_BASE_URL) {
            self.api_base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(tenant) = lookup(ENV_TENANT) {
            self = self.with_tenant(&tenant);
        }
        self
    }

    /// Path of the persisted credential record
    #[must_use]
    pub fn credential_path(&self) -> PathBuf {
        self.output_dir.join(crate::auth::CREDENTIAL_FILE_NAME)
    }
}

fn replace_tenant(url: &str, tenant: &str) -> String {
    url.replacen("/common/", &format!("/{tenant}/"), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let options = GraphOptions::default();
        assert_eq!(options.client_id, DEFAULT_CLIENT_ID);
        assert_eq!(options.audience, GrantAudience::Resource(GRAPH_RESOURCE.to_string()));
        assert_eq!(options.page_delay, Duration::from_millis(100));
        assert!(options.credential_path().ends_with("tokens.json"));
    }

    #[test]
    fn test_audience_params() {
        let resource = GrantAudience::default();
        assert_eq!(resource.param(), ("resource", GRAPH_RESOURCE));
        assert_eq!(resource.device_code_param(), "code");

        let scope = GrantAudience::Scope("User.Read offline_access".to_string());
        assert_eq!(scope.param(), ("scope", "User.Read offline_access"));
        assert_eq!(scope.device_code_param(), "device_code");
    }

    #[test]
    fn test_scope_based_uses_v2_endpoints() {
        let options = GraphOptions::scope_based("User.Read");
        assert_eq!(options.device_code_url, V2_DEVICE_CODE_URL);
        assert_eq!(options.token_url, V2_TOKEN_URL);
    }

    #[test]
    fn test_with_tenant() {
        let options = GraphOptions::default().with_tenant("contoso.onmicrosoft.com");
        assert_eq!(
            options.token_url,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/token?api-version=1.0"
        );
        assert!(options.device_code_url.contains("/contoso.onmicrosoft.com/"));

        let untouched = GraphOptions::default().with_tenant("  ");
        assert_eq!(untouched.token_url, DEFAULT_TOKEN_URL);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_CLIENT_ID, "my-client"),
            (ENV_OUTPUT_DIR, "/tmp/out"),
            (ENV_API_BASE_URL, "https://graph.microsoft.com/beta/"),
            (ENV_TENANT, ""),
        ]
        .into_iter()
        .collect();

        let options =
            GraphOptions::default().with_overrides(|key| env.get(key).map(|v| (*v).to_string()));

        assert_eq!(options.client_id, "my-client");
        assert_eq!(options.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(options.api_base_url, GRAPH_BETA_URL);
        assert_eq!(options.token_url, DEFAULT_TOKEN_URL);
    }
}
