use crate::registry;
use crate::registry::message::{ErrorDetail, ErrorObject, ErrorReply};
use hyper::StatusCode;
use std::fmt;
use tracing::debug;

#[derive(Debug, PartialEq)]
pub enum Error {
    BadRequest(String),
    NotFound,
    MethodNotAllowed,
    Registry(registry::Error),
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::BadRequest(err) => write!(f, "Bad Request: {err}"),
            Error::NotFound => write!(f, "Not Found"),
            Error::MethodNotAllowed => write!(f, "Method Not Allowed"),
            Error::Registry(err) => write!(f, "{err}"),
            Error::Internal(err) => write!(f, "Internal Server Error: {err}"),
        }
    }
}

impl From<registry::Error> for Error {
    fn from(error: registry::Error) -> Self {
        Error::Registry(error)
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        debug!("Serde JSON error: {error:?}");
        Error::Internal("(De)Serialization error during operations".to_string())
    }
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::Registry(registry::Error::VersionExhausted) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::Registry(_) => StatusCode::CONFLICT,
        }
    }

    pub fn as_reply(&self, trace_id: Option<&String>) -> ErrorReply {
        let mut object = match self {
            Error::Registry(err) => ErrorObject::from_registry_error(err),
            _ => {
                let code = match self {
                    Error::BadRequest(_) => "BAD_REQUEST",
                    Error::NotFound => "NOT_FOUND",
                    Error::MethodNotAllowed => "METHOD_NOT_ALLOWED",
                    _ => "INTERNAL_SERVER_ERROR",
                };
                ErrorObject {
                    code: code.to_string(),
                    message: self.to_string(),
                    detail: ErrorDetail::default(),
                }
            }
        };
        object.detail.trace_id = trace_id.cloned();

        ErrorReply {
            errors: vec![object],
        }
    }
}
