//! Error types for the Graph device SDK

use std::fmt;

use thiserror::Error;

use crate::auth::StoreError;
use crate::transport::TransportError;

/// Phase of the pipeline an error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Initial device-code request
    DeviceCodeRequest,
    /// Token redemption poll loop
    Polling,
    /// Refresh-token exchange
    Refresh,
    /// Bearer-authenticated API call
    ApiCall,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DeviceCodeRequest => "device-code request",
            Self::Polling => "polling",
            Self::Refresh => "refresh",
            Self::ApiCall => "API call",
        };
        f.write_str(name)
    }
}

/// Main error type for the Graph device SDK
#[derive(Error, Debug)]
pub enum GraphError {
    /// Network or connection failure
    #[error("{phase} failed: transport error: {source}")]
    Transport {
        /// Phase in which the request was issued
        phase: Phase,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// Malformed or unexpected response shape
    #[error("{phase} failed: unexpected response: {message}")]
    Protocol {
        /// Phase in which the response was received
        phase: Phase,
        /// What was wrong with the response
        message: String,
    },

    /// The device-code flow could not be started
    #[error("device-code request failed: cannot start flow: {0}")]
    FlowStart(String),

    /// User has not yet approved the device code.
    ///
    /// Only observed inside the poll loop; never returned to callers.
    #[error("polling: authorization pending")]
    AuthorizationPending,

    /// Server asked the client to poll less often.
    ///
    /// Only observed inside the poll loop; never returned to callers.
    #[error("polling: slow down requested")]
    SlowDown,

    /// Provider refused the device-code grant
    #[error("polling failed: authorization denied ({code}): {description}")]
    AuthorizationDenied {
        /// OAuth error code
        code: String,
        /// Provider supplied description
        description: String,
    },

    /// Device code expired before the user approved it
    #[error("polling failed: device code expired after {waited_secs} seconds without approval")]
    AuthorizationExpired {
        /// Seconds spent waiting in the poll loop
        waited_secs: u64,
    },

    /// Token endpoint rejected a refresh-token exchange
    #[error("{phase} failed: token endpoint rejected the request (status {status}, {code}): {description}")]
    Rejected {
        /// Phase in which the rejection happened
        phase: Phase,
        /// HTTP status code
        status: u16,
        /// OAuth error code
        code: String,
        /// Provider supplied description
        description: String,
    },

    /// Non-2xx response from the directory API
    #[error("API call failed with status {status}: {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// Credential could not be read from or written to storage
    #[error("credential store error: {0}")]
    Persistence(#[from] StoreError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, GraphError>;

impl GraphError {
    /// Create a transport error for the given phase
    pub fn transport(phase: Phase, source: TransportError) -> Self {
        Self::Transport { phase, source }
    }

    /// Create a protocol error for the given phase
    pub fn protocol(phase: Phase, msg: impl Into<String>) -> Self {
        Self::Protocol {
            phase,
            message: msg.into(),
        }
    }

    /// Create a flow start error
    pub fn flow_start(msg: impl Into<String>) -> Self {
        Self::FlowStart(msg.into())
    }

    /// Create an API error
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for failures worth retrying at a higher level (network errors)
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Phase this error belongs to, when known
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Transport { phase, .. }
            | Self::Protocol { phase, .. }
            | Self::Rejected { phase, .. } => Some(*phase),
            Self::FlowStart(_) => Some(Phase::DeviceCodeRequest),
            Self::AuthorizationPending
            | Self::SlowDown
            | Self::AuthorizationDenied { .. }
            | Self::AuthorizationExpired { .. } => Some(Phase::Polling),
            Self::Api { .. } => Some(Phase::ApiCall),
            Self::Persistence(_) | Self::InvalidConfig(_) => None,
        }
    }
}

/// Pagination failure carrying the records gathered before it
#[derive(Error, Debug)]
#[error("pagination stopped after {} records: {source}", .records.len())]
pub struct PageError {
    /// Records collected from the pages that succeeded
    pub records: Vec<serde_json::Value>,
    /// Error that stopped the walk
    #[source]
    pub source: GraphError,
}

impl PageError {
    /// Split into the partial records and the error
    #[must_use]
    pub fn into_parts(self) -> (Vec<serde_json::Value>, GraphError) {
        (self.records, self.source)
    }
}

impl From<PageError> for GraphError {
    fn from(err: PageError) -> Self {
        err.source
    }
}
