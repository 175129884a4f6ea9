use std::fmt;

use thiserror::Error;

/// Failure of a single API call, with the message to show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    /// 401 or 403; the session has already been cleared.
    Unauthorized(u16),
    HttpStatus(u16),
    Timeout,
    Network,
    /// Body was not the JSON shape the endpoint promises.
    Decode,
    /// The server answered `success: false`.
    Rejected,
    Cancelled,
}

/// How callers should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Handled globally: session cleared, user must log in again.
    Auth,
    /// Worth retrying the same action.
    Transient,
    /// Retrying the same request will not help.
    Permanent,
}

impl FailureKind {
    pub fn class(&self) -> ErrorClass {
        match self {
            FailureKind::Unauthorized(_) => ErrorClass::Auth,
            FailureKind::Timeout | FailureKind::Network => ErrorClass::Transient,
            FailureKind::HttpStatus(code) if *code == 408 || *code == 429 || *code >= 500 => {
                ErrorClass::Transient
            }
            FailureKind::HttpStatus(_)
            | FailureKind::InvalidUrl
            | FailureKind::Decode
            | FailureKind::Rejected
            | FailureKind::Cancelled => ErrorClass::Permanent,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::Unauthorized(code) => write!(f, "unauthorized ({code})"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "unexpected response body"),
            FailureKind::Rejected => write!(f, "rejected by server"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
