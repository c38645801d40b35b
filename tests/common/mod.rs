//! Shared test fixtures: a scripted in-memory transport and canned bodies

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use graph_device_sdk::auth::CodePresenter;
use graph_device_sdk::{
    Credential, DeviceCodeSession, HttpRequest, HttpResponse, HttpTransport, TransportError,
};
use tokio::time::Instant;

/// One scripted reaction to a request
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with a status and body
    Respond(u16, String),
    /// Fail at the network level
    Fail(String),
    /// Answer after a delay (virtual time under a paused clock)
    Delayed(Duration, u16, String),
}

impl Reply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::Respond(status, body.to_string())
    }
}

/// Request as seen by the transport, with the (virtual) time it arrived
#[derive(Debug, Clone)]
pub struct Recorded {
    pub at: Instant,
    pub request: HttpRequest,
}

impl Recorded {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(self.request.body.as_deref().unwrap_or_default()).into_owned()
    }
}

/// Transport that replays queued replies in order, then the fallback
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    recorded: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            recorded: Mutex::new(Vec::new()),
        }
    }

    /// Transport that must never be called
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Reply used once the queue is exhausted
    pub fn with_fallback(mut self, reply: Reply) -> Self {
        self.fallback = Some(reply);
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url_fragment: &str) -> Vec<Recorded> {
        self.recorded()
            .into_iter()
            .filter(|r| r.request.url.contains(url_fragment))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.recorded.lock().unwrap().push(Recorded {
            at: Instant::now(),
            request,
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .expect("transport script exhausted");

        match reply {
            Reply::Respond(status, body) => Ok(HttpResponse {
                status,
                body: body.into_bytes(),
            }),
            Reply::Fail(message) => Err(TransportError::new(message)),
            Reply::Delayed(delay, status, body) => {
                tokio::time::sleep(delay).await;
                Ok(HttpResponse {
                    status,
                    body: body.into_bytes(),
                })
            }
        }
    }
}

/// Presenter that records what it was shown instead of printing
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    user_codes: Arc<Mutex<Vec<String>>>,
    authenticated: Arc<AtomicU32>,
}

impl RecordingPresenter {
    pub fn user_codes(&self) -> Vec<String> {
        self.user_codes.lock().unwrap().clone()
    }

    pub fn authenticated_count(&self) -> u32 {
        self.authenticated.load(Ordering::SeqCst)
    }
}

impl CodePresenter for RecordingPresenter {
    fn present(&self, session: &DeviceCodeSession) {
        self.user_codes.lock().unwrap().push(session.user_code.clone());
    }

    fn authenticated(&self, _credential: &Credential) {
        self.authenticated.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Canned identity provider bodies
// ============================================================================

pub fn device_code_reply(interval: u64, expires_in: u64) -> Reply {
    Reply::json(
        200,
        serde_json::json!({
            "user_code": "FQK5HW3UF",
            "device_code": "DAQABAAEAAAD-device-code",
            "verification_url": "https://microsoft.com/devicelogin",
            "expires_in": expires_in.to_string(),
            "interval": interval.to_string(),
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code FQK5HW3UF to authenticate."
        }),
    )
}

pub fn oauth_error(code: &str) -> Reply {
    Reply::json(
        400,
        serde_json::json!({
            "error": code,
            "error_description": format!("AADSTS: {code}"),
        }),
    )
}

pub fn token_reply(access_token: &str, refresh_token: Option<&str>) -> Reply {
    let mut body = serde_json::json!({
        "token_type": "Bearer",
        "access_token": access_token,
        "expires_in": "3599",
        "resource": "https://graph.microsoft.com",
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = serde_json::Value::String(refresh_token.to_string());
    }
    Reply::json(200, body)
}

/// Credential expiring `minutes` from now
pub fn credential_expiring_in(minutes: i64, refresh_token: Option<&str>) -> Credential {
    Credential {
        access_token: format!("cached-{minutes}"),
        refresh_token: refresh_token.map(str::to_string),
        token_type: "Bearer".to_string(),
        expires_in: None,
        expires_on: None,
        resource: Some("https://graph.microsoft.com".to_string()),
        scope: None,
        expires_at: chrono::Utc::now() + chrono::Duration::minutes(minutes),
    }
}

/// Page of directory records, optionally linking to the next one
pub fn page(ids: &[&str], next_link: Option<&str>) -> Reply {
    let value: Vec<_> = ids
        .iter()
        .map(|id| serde_json::json!({"id": id, "displayName": format!("User {id}")}))
        .collect();
    let mut body = serde_json::json!({ "value": value });
    if let Some(link) = next_link {
        body["@odata.nextLink"] = serde_json::Value::String(link.to_string());
    }
    Reply::json(200, body)
}
