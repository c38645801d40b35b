//! Credential manager: cache, refresh and device-code sign-in

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::time::Instant;

use super::credential::{Credential, TokenResponse};
use super::device_code::{DeviceCodeSession, slowed_interval};
use super::presenter::{CodePresenter, ConsolePresenter};
use super::store::{CredentialStore, StoreError};
use crate::error::{GraphError, Phase, Result};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
use crate::types::GraphOptions;
use crate::utils::{redact, truncate_body};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const REFRESH_TOKEN_GRANT: &str = "refresh_token";

/// Builder for [`CredentialManager`]
#[derive(Default)]
pub struct CredentialManagerBuilder {
    options: Option<GraphOptions>,
    transport: Option<Arc<dyn HttpTransport>>,
    store: Option<CredentialStore>,
    presenter: Option<Box<dyn CodePresenter>>,
}

impl CredentialManagerBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom options
    #[must_use]
    pub fn options(mut self, options: GraphOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the HTTP transport
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set custom credential storage (default: `<output_dir>/tokens.json`)
    #[must_use]
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set how the user code is shown (default: [`ConsolePresenter`])
    #[must_use]
    pub fn presenter(mut self, presenter: impl CodePresenter + 'static) -> Self {
        self.presenter = Some(Box::new(presenter));
        self
    }

    /// Build the credential manager
    ///
    /// # Errors
    ///
    /// Returns an error if no transport was supplied and the default HTTP
    /// client cannot be built.
    pub fn build(self) -> Result<CredentialManager> {
        let options = self.options.unwrap_or_default();
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(options.http_timeout)?),
        };
        let store = self
            .store
            .unwrap_or_else(|| CredentialStore::in_dir(&options.output_dir));

        Ok(CredentialManager {
            options,
            transport,
            store,
            presenter: self.presenter.unwrap_or_else(|| Box::new(ConsolePresenter)),
            cached: Mutex::new(None),
        })
    }
}

/// Owns the credential lifecycle
///
/// Hands out bearer tokens, reusing the cached credential while it is valid,
/// refreshing it when it is not, and falling back to the interactive
/// device-code flow when refresh is impossible or fails.
pub struct CredentialManager {
    options: GraphOptions,
    transport: Arc<dyn HttpTransport>,
    store: CredentialStore,
    presenter: Box<dyn CodePresenter>,
    cached: Mutex<Option<Credential>>,
}

impl std::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("options", &self.options)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Create a manager with the given options and the default transport
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(options: GraphOptions) -> Result<Self> {
        Self::builder().options(options).build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> CredentialManagerBuilder {
        CredentialManagerBuilder::new()
    }

    /// Get the options
    #[must_use]
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Get the credential store
    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Get a valid bearer token, authenticating or refreshing as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the device-code flow is needed and fails.
    pub async fn access_token(&self) -> Result<String> {
        Ok(self.credential().await?.access_token)
    }

    /// Get a valid credential, authenticating or refreshing as needed
    ///
    /// # Errors
    ///
    /// Returns an error if the device-code flow is needed and fails.
    pub async fn credential(&self) -> Result<Credential> {
        let candidate = match self.memory() {
            Some(credential) => Some(credential),
            None => self.load_cached(),
        };

        if let Some(credential) = candidate {
            if credential.is_valid_at(Utc::now()) {
                tracing::debug!(expires_at = %credential.expires_at, "Using cached credential");
                self.remember(credential.clone());
                return Ok(credential);
            }

            if credential.refresh_token.is_some() {
                tracing::info!("Credential expired, refreshing");
                match self.refresh(&credential).await {
                    Ok(refreshed) => return Ok(refreshed),
                    Err(e) => {
                        tracing::warn!("Refresh failed, falling back to device-code sign-in: {e}");
                    }
                }
            } else {
                tracing::debug!("Credential expired and has no refresh token");
            }
        } else {
            tracing::debug!("No cached credential found");
        }

        self.run_device_code_flow().await
    }

    /// Read the persisted credential; missing or malformed records are `None`
    #[must_use]
    pub fn load_cached(&self) -> Option<Credential> {
        match self.store.load() {
            Ok(credential) => Some(credential),
            Err(StoreError::NotFound) => None,
            Err(e) => {
                tracing::debug!(path = %self.store.path().display(), "Ignoring unreadable credential record: {e}");
                None
            }
        }
    }

    /// Exchange the credential's refresh token for a new credential
    ///
    /// On success the new credential replaces the cached and persisted one.
    /// On failure nothing is cleared.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential has no refresh token, the request
    /// fails, or the token endpoint rejects the exchange.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .ok_or_else(|| GraphError::protocol(Phase::Refresh, "credential has no refresh token"))?;

        let (audience_key, audience_value) = self.options.audience.param();
        let params = [
            ("client_id", self.options.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", REFRESH_TOKEN_GRANT),
            (audience_key, audience_value),
        ];

        tracing::debug!(refresh_token = %redact(refresh_token), "Refreshing credential");
        let response = self
            .post_form(&self.options.token_url, &params, Phase::Refresh)
            .await?;

        let token_response = TokenResponse::parse(&response.body, Phase::Refresh)?;
        if let Some((code, description)) = token_response.oauth_error() {
            return Err(GraphError::Rejected {
                phase: Phase::Refresh,
                status: response.status,
                code,
                description,
            });
        }
        if !response.is_success() {
            return Err(GraphError::Rejected {
                phase: Phase::Refresh,
                status: response.status,
                code: format!("http_{}", response.status),
                description: truncate_body(&response.body),
            });
        }

        let mut refreshed = token_response.into_credential(Utc::now()).ok_or_else(|| {
            GraphError::protocol(Phase::Refresh, "no access token in refresh response")
        })?;
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }

        self.adopt(refreshed.clone());
        tracing::info!(expires_at = %refreshed.expires_at, "Credential refreshed");
        Ok(refreshed)
    }

    /// Run the interactive device-code flow end to end
    ///
    /// # Errors
    ///
    /// Returns an error if the flow cannot start, the user denies the
    /// request, or the session expires.
    pub async fn run_device_code_flow(&self) -> Result<Credential> {
        tracing::info!("Starting device-code authentication");

        let session = self.request_device_code().await?;
        self.presenter.present(&session);

        let credential = self.poll_for_credential(&session).await?;
        self.adopt(credential.clone());
        self.presenter.authenticated(&credential);

        tracing::info!(expires_at = %credential.expires_at, "Device-code authentication succeeded");
        Ok(credential)
    }

    /// Start a device-code session
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::FlowStart`] for network failures, non-2xx
    /// statuses and malformed responses alike.
    pub async fn request_device_code(&self) -> Result<DeviceCodeSession> {
        let (audience_key, audience_value) = self.options.audience.param();
        let params = [
            ("client_id", self.options.client_id.as_str()),
            (audience_key, audience_value),
        ];

        let response = self
            .post_form(&self.options.device_code_url, &params, Phase::DeviceCodeRequest)
            .await
            .map_err(|e| GraphError::flow_start(e.to_string()))?;

        if !response.is_success() {
            return Err(GraphError::flow_start(format!(
                "status {}: {}",
                response.status,
                truncate_body(&response.body)
            )));
        }

        let session = DeviceCodeSession::from_response(&response.body, self.options.min_poll_interval)?;
        tracing::debug!(
            user_code = %session.user_code,
            interval_secs = session.poll_interval.as_secs(),
            expires_at = %session.expires_at,
            "Device code issued"
        );
        Ok(session)
    }

    /// Poll the token endpoint until the session is approved, denied or expires
    ///
    /// Transport failures are retried on the next tick. The loop never starts
    /// a redemption after the session deadline and abandons one still in
    /// flight when the deadline passes.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::AuthorizationDenied`],
    /// [`GraphError::AuthorizationExpired`] or a protocol error.
    pub async fn poll_for_credential(&self, session: &DeviceCodeSession) -> Result<Credential> {
        let started = Instant::now();
        let deadline = session.deadline();
        let mut interval = session.poll_interval;
        let expired = || GraphError::AuthorizationExpired {
            waited_secs: started.elapsed().as_secs(),
        };

        let code_param = self.options.audience.device_code_param();
        let params = [
            ("client_id", self.options.client_id.as_str()),
            ("grant_type", DEVICE_CODE_GRANT),
            (code_param, session.device_code()),
        ];

        let mut attempt: u32 = 0;
        loop {
            if session.is_expired() {
                return Err(expired());
            }
            let wake = Instant::now()
                .checked_add(interval)
                .map_or(deadline, |at| at.min(deadline));
            tokio::time::sleep_until(wake).await;
            if session.is_expired() {
                return Err(expired());
            }

            attempt += 1;
            let redemption = self.post_form(&self.options.token_url, &params, Phase::Polling);
            let response = match tokio::time::timeout_at(deadline, redemption).await {
                Err(_) => return Err(expired()),
                Ok(Err(e)) if e.is_transient() => {
                    tracing::warn!(attempt, "Poll request failed, retrying: {e}");
                    continue;
                }
                Ok(Err(e)) => return Err(e),
                Ok(Ok(response)) => response,
            };

            match redeem(&response) {
                Ok(credential) => {
                    tracing::debug!(attempt, "Device code redeemed");
                    return Ok(credential);
                }
                Err(GraphError::AuthorizationPending) => {
                    tracing::debug!(attempt, "Authorization pending");
                }
                Err(GraphError::SlowDown) => {
                    interval = slowed_interval(interval);
                    tracing::debug!(
                        attempt,
                        interval_secs = interval.as_secs(),
                        "Server asked to slow down"
                    );
                }
                Err(GraphError::AuthorizationExpired { .. }) => return Err(expired()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Delete the stored credential and forget the cached one
    ///
    /// # Errors
    ///
    /// Returns an error if the record exists but cannot be deleted.
    pub fn logout(&self) -> Result<()> {
        self.forget();
        self.store.delete()?;
        tracing::info!(path = %self.store.path().display(), "Credential removed");
        Ok(())
    }

    /// Check whether a valid credential is available without network access
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current_credential()
            .is_some_and(|credential| credential.is_valid_at(Utc::now()))
    }

    /// Current credential (cached or persisted) without refreshing
    #[must_use]
    pub fn current_credential(&self) -> Option<Credential> {
        self.memory().or_else(|| self.load_cached())
    }

    /// Install a freshly issued credential in memory and on disk
    fn adopt(&self, credential: Credential) {
        if let Err(e) = self.store.save(&credential) {
            tracing::warn!(path = %self.store.path().display(), "Could not persist credential: {e}");
        }
        self.remember(credential);
    }

    fn memory(&self) -> Option<Credential> {
        self.cached
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn remember(&self, credential: Credential) {
        match self.cached.lock() {
            Ok(mut guard) => *guard = Some(credential),
            Err(poisoned) => *poisoned.into_inner() = Some(credential),
        }
    }

    fn forget(&self) {
        match self.cached.lock() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    async fn post_form(
        &self,
        url: &str,
        params: &[(&str, &str)],
        phase: Phase,
    ) -> Result<HttpResponse> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| GraphError::protocol(phase, format!("cannot encode form body: {e}")))?;
        let request = HttpRequest::new(Method::POST, url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .header("User-Agent", self.options.user_agent.as_str())
            .body(body);

        self.transport
            .perform(request)
            .await
            .map_err(|e| GraphError::transport(phase, e))
    }
}

/// Classify a redemption response
///
/// Identity providers answer pending polls with a 400 and an OAuth error
/// body, so the body decides, not the status.
fn redeem(response: &HttpResponse) -> Result<Credential> {
    let token_response = TokenResponse::parse(&response.body, Phase::Polling)?;

    if let Some((code, description)) = token_response.oauth_error() {
        return Err(match code.as_str() {
            "authorization_pending" => GraphError::AuthorizationPending,
            "slow_down" => GraphError::SlowDown,
            "expired_token" | "code_expired" => GraphError::AuthorizationExpired { waited_secs: 0 },
            _ => GraphError::AuthorizationDenied { code, description },
        });
    }

    token_response.into_credential(Utc::now()).ok_or_else(|| {
        GraphError::protocol(
            Phase::Polling,
            format!(
                "status {} without access token or error: {}",
                response.status,
                truncate_body(&response.body)
            ),
        )
    })
}
