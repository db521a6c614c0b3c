//! Error types for Arbor
//!
//! Every fallible call against the coordination service returns a
//! [`ClientError`]. Retry decisions never match on the variant directly;
//! they inspect the coarse [`ErrorKind`] tag returned by [`ClientError::kind`].

use std::fmt::{Display, Formatter};

use crate::OperationKind;

/// Coarse classification used by the retry layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The coordination session lapsed; retryable
    SessionExpired,
    /// The node already exists
    NodeExists,
    /// The node does not exist
    NoNode,
    /// No more retries are permitted by the policy; terminal
    PolicyExhausted,
    /// Any other transport, protocol, or local failure; never retried
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SessionExpired => "session_expired",
            ErrorKind::NodeExists => "node_exists",
            ErrorKind::NoNode => "no_node",
            ErrorKind::PolicyExhausted => "policy_exhausted",
            ErrorKind::Other => "other",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error type for coordination-service client operations
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("session expired")]
    SessionExpired,

    #[error("node already exists: {0}")]
    NodeExists(String),

    #[error("node does not exist: {0}")]
    NoNode(String),

    #[error("node has children: {0}")]
    NotEmpty(String),

    #[error("retry budget exhausted for {kind} {path} after {retries} retries")]
    PolicyExhausted {
        kind: OperationKind,
        path: String,
        retries: u32,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    /// The tag the retry layer dispatches on
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::SessionExpired => ErrorKind::SessionExpired,
            ClientError::NodeExists(_) => ErrorKind::NodeExists,
            ClientError::NoNode(_) => ErrorKind::NoNode,
            ClientError::PolicyExhausted { .. } => ErrorKind::PolicyExhausted,
            ClientError::NotEmpty(_)
            | ClientError::InvalidPath(_)
            | ClientError::Config(_)
            | ClientError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind() == ErrorKind::SessionExpired
    }

    /// Terminal session expiration: local retries ran out
    pub fn is_policy_exhausted(&self) -> bool {
        self.kind() == ErrorKind::PolicyExhausted
    }
}

impl From<config::ConfigError> for ClientError {
    fn from(value: config::ConfigError) -> Self {
        ClientError::Config(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
