use std::fmt::Display;

#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    AlreadyLocked(String),
    AlreadyUnlocked(String),
    VersionMismatch {
        resource: String,
        expected: u64,
        got: u64,
    },
    VersionExhausted,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AlreadyLocked(resource) => write!(f, "{resource} is already locked."),
            Error::AlreadyUnlocked(resource) => write!(f, "{resource} is already unlocked"),
            Error::VersionMismatch {
                resource,
                expected,
                got,
            } => write!(
                f,
                "{resource}: expected version {expected}, got version {got}"
            ),
            Error::VersionExhausted => write!(f, "no fencing token left to issue"),
        }
    }
}

impl std::error::Error for Error {}
