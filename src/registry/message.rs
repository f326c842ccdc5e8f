//! JSON bodies exchanged between the client and the server.

use crate::registry::{self, Lifetime};
use serde::{Deserialize, Serialize};

pub const LOCK_PATH: &str = "/v1/lock";
pub const UNLOCK_PATH: &str = "/v1/unlock";

pub const ALREADY_LOCKED: &str = "ALREADY_LOCKED";
pub const ALREADY_UNLOCKED: &str = "ALREADY_UNLOCKED";
pub const VERSION_MISMATCH: &str = "VERSION_MISMATCH";
pub const VERSION_EXHAUSTED: &str = "VERSION_EXHAUSTED";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockRequest {
    pub resource: String,
    pub lifetime: Lifetime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LockReply {
    pub version: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnlockRequest {
    pub resource: String,
    pub version: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnlockReply {}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub errors: Vec<ErrorObject>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub detail: ErrorDetail,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub got: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorObject {
    pub fn from_registry_error(error: &registry::Error) -> Self {
        let (code, detail) = match error {
            registry::Error::AlreadyLocked(resource) => (
                ALREADY_LOCKED,
                ErrorDetail {
                    resource: Some(resource.clone()),
                    ..ErrorDetail::default()
                },
            ),
            registry::Error::AlreadyUnlocked(resource) => (
                ALREADY_UNLOCKED,
                ErrorDetail {
                    resource: Some(resource.clone()),
                    ..ErrorDetail::default()
                },
            ),
            registry::Error::VersionMismatch {
                resource,
                expected,
                got,
            } => (
                VERSION_MISMATCH,
                ErrorDetail {
                    resource: Some(resource.clone()),
                    expected: Some(*expected),
                    got: Some(*got),
                    trace_id: None,
                },
            ),
            registry::Error::VersionExhausted => (VERSION_EXHAUSTED, ErrorDetail::default()),
        };

        Self {
            code: code.to_string(),
            message: error.to_string(),
            detail,
        }
    }

    /// Rebuild the registry error this object was produced from, if any.
    pub fn to_registry_error(&self) -> Option<registry::Error> {
        let resource = self.detail.resource.clone();
        match self.code.as_str() {
            ALREADY_LOCKED => resource.map(registry::Error::AlreadyLocked),
            ALREADY_UNLOCKED => resource.map(registry::Error::AlreadyUnlocked),
            VERSION_MISMATCH => match (resource, self.detail.expected, self.detail.got) {
                (Some(resource), Some(expected), Some(got)) => {
                    Some(registry::Error::VersionMismatch {
                        resource,
                        expected,
                        got,
                    })
                }
                _ => None,
            },
            VERSION_EXHAUSTED => Some(registry::Error::VersionExhausted),
            _ => None,
        }
    }
}
