//! Unified error type.

use std::fmt;

/// The error type returned by gantry's fallible operations.
///
/// Application-level errors (400, 404, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures: a route table that cannot be compiled, a payload
/// a serializer rejects, or a socket that cannot be bound.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// A path pattern was malformed or conflicts with an earlier registration.
    Route { method: http::Method, path: String, reason: String },
    Serialize(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Route { method, path, reason } => {
                write!(f, "invalid route `{method} {path}`: {reason}")
            }
            Self::Serialize(reason) => write!(f, "serialize: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialize(e.to_string())
    }
}
