//! The error taxonomy every operation surfaces to its caller.
//!
//! Each component returns its most specific kind; nothing downgrades
//! `Unauthenticated`/`Unavailable` into `Internal` or vice versa. The
//! distinction must survive all the way to the external interface so an
//! operator can tell "bad credentials" from "dependency down".

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing/malformed authorization header, or token rejected by the
    /// authority. Carries no task data.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The authentication authority could not be reached.
    #[error("authentication service unavailable: {0}")]
    Unavailable(String),

    /// Required field missing or empty, or malformed payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Operation addressed a nonexistent task identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other store/transport failure. Surfaced opaquely; the detail
    /// stays in logs, not in responses.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Stable wire label for the error kind, independent of the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "unauthenticated",
            Error::Unavailable(_) => "unavailable",
            Error::InvalidInput(_) => "invalid_input",
            Error::NotFound(_) => "not_found",
            Error::Internal(_) => "internal",
        }
    }

    /// The message callers may see. `Internal` is deliberately opaque.
    pub fn public_message(&self) -> String {
        match self {
            Error::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Internal(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.into())
    }
}
