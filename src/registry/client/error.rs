use crate::registry;
use hyper::StatusCode;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Error {
    /// The server could not be reached, or the connection broke mid-call.
    Transport(String),
    /// The server refused the call with a lock registry error.
    Remote(registry::Error),
    /// The server refused the call for another reason.
    Rejected { status: StatusCode, message: String },
    /// The server answered with something that is not a valid reply.
    Protocol(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Transport(err) => write!(f, "Transport error: {err}"),
            Error::Remote(err) => write!(f, "{err}"),
            Error::Rejected { status, message } => write!(f, "Error {status}: {message}"),
            Error::Protocol(err) => write!(f, "Protocol error: {err}"),
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(error: hyper::Error) -> Self {
        Error::Transport(error.to_string())
    }
}

impl From<hyper::http::Error> for Error {
    fn from(error: hyper::http::Error) -> Self {
        Error::Protocol(error.to_string())
    }
}
