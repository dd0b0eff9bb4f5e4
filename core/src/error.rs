//! Error types for the events API client.
//!
//! # Design
//! The variants separate "never reached the server" (`Network`), "server
//! rejected or erred" (`Server`) and "server answered with unusable data"
//! (`Decode`), so callers can react to each differently. `Auth` wraps whatever
//! stopped the session bootstrap from succeeding.
//!
//! `ClientError` is `Clone` because a single bootstrap outcome is delivered to
//! every caller that was waiting on it.

use thiserror::Error;

/// Errors returned by `EventClient` parse methods and `ServiceClient` operations.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The transport failed to reach the server or to read its reply.
    #[error("network error: {0}")]
    Network(String),

    /// The server returned a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// The response body could not be decoded into the expected entity.
    #[error("decode failed: {0}")]
    Decode(String),

    /// No session could be established for an authenticated call.
    #[error("could not establish session: {0}")]
    Auth(#[source] Box<ClientError>),

    /// The request payload could not be serialized to JSON.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The operation needs a server-confirmed event (non-empty id).
    #[error("event has no server-assigned id")]
    MissingEventId,

    /// A locally built event violates the event invariants.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// The configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    /// Wrap a bootstrap failure as an `Auth` error. Already-wrapped errors are
    /// returned unchanged.
    pub fn into_auth(self) -> Self {
        match self {
            auth @ ClientError::Auth(_) => auth,
            other => ClientError::Auth(Box::new(other)),
        }
    }

    /// True for failures a caller might reasonably retry: transport errors and
    /// 5xx responses. Nothing in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) => true,
            ClientError::Server { status, .. } => *status >= 500,
            ClientError::Auth(cause) => cause.is_retryable(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_auth_does_not_double_wrap() {
        let err = ClientError::Network("refused".to_string()).into_auth();
        let again = err.clone().into_auth();
        match again {
            ClientError::Auth(cause) => assert!(matches!(*cause, ClientError::Network(_))),
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn retryable_classification() {
        assert!(ClientError::Network("timeout".to_string()).is_retryable());
        assert!(ClientError::Server { status: 503, body: String::new() }.is_retryable());
        assert!(!ClientError::Server { status: 422, body: String::new() }.is_retryable());
        assert!(!ClientError::Decode("bad".to_string()).is_retryable());
        assert!(ClientError::Network("x".to_string()).into_auth().is_retryable());
    }

    #[test]
    fn display_includes_status_and_body() {
        let err = ClientError::Server { status: 404, body: "missing".to_string() };
        assert_eq!(err.to_string(), "HTTP 404: missing");
    }
}
