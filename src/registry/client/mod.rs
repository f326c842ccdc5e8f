mod error;

use crate::registry::message::{
    ErrorReply, LockReply, LockRequest, UnlockReply, UnlockRequest, LOCK_PATH, UNLOCK_PATH,
};
use crate::registry::Lifetime;
pub use error::Error;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, instrument};

/// Issues lock and unlock calls to a dutex server.
///
/// Each call opens its own connection. Failures are reported as-is and never retried.
#[derive(Clone, Debug)]
pub struct Client {
    address: String,
    connect_timeout: Duration,
}

impl Client {
    /// `address` is `host:port`, or `:port` for the local host.
    pub fn new(address: &str, connect_timeout: Duration) -> Self {
        let address = if address.starts_with(':') {
            format!("127.0.0.1{address}")
        } else {
            address.to_string()
        };

        Self {
            address,
            connect_timeout,
        }
    }

    /// # Errors
    ///
    /// * `Error::Remote(registry::Error::AlreadyLocked)` if the resource holds a live lease
    /// * `Error::Transport` if the server cannot be reached
    #[instrument(skip(self))]
    pub async fn lock(&self, resource: &str, lifetime: Lifetime) -> Result<u64, Error> {
        let request = LockRequest {
            resource: resource.to_string(),
            lifetime,
        };

        let reply: LockReply = self.call(LOCK_PATH, &request).await?;
        Ok(reply.version)
    }

    /// # Errors
    ///
    /// * `Error::Remote(registry::Error::AlreadyUnlocked)` if no lease is recorded
    /// * `Error::Remote(registry::Error::VersionMismatch)` if `version` is not the current token
    /// * `Error::Transport` if the server cannot be reached
    #[instrument(skip(self))]
    pub async fn unlock(&self, resource: &str, version: u64) -> Result<(), Error> {
        let request = UnlockRequest {
            resource: resource.to_string(),
            version,
        };

        let _: UnlockReply = self.call(UNLOCK_PATH, &request).await?;
        Ok(())
    }

    async fn call<Q, R>(&self, path: &str, body: &Q) -> Result<R, Error>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let body = serde_json::to_vec(body).map_err(|error| Error::Protocol(error.to_string()))?;

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| Error::Transport(format!("timed out connecting to {}", self.address)))?
            .map_err(|error| {
                Error::Transport(format!("unable to connect to {}: {error}", self.address))
            })?;

        let (mut sender, connection) = http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(error) = connection.await {
                debug!("Connection closed with error: {error}");
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(HOST, &self.address)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body)))?;

        let response = sender.send_request(request).await?;
        let status = response.status();
        let body = response.into_body().collect().await?.to_bytes();
        debug!("Received {status} from {}", self.address);

        if status.is_success() {
            return serde_json::from_slice(&body)
                .map_err(|error| Error::Protocol(format!("invalid reply: {error}")));
        }

        Err(decode_error(status, &body))
    }
}

fn decode_error(status: StatusCode, body: &[u8]) -> Error {
    let Ok(reply) = serde_json::from_slice::<ErrorReply>(body) else {
        return Error::Rejected {
            status,
            message: String::from_utf8_lossy(body).into_owned(),
        };
    };

    let Some(object) = reply.errors.into_iter().next() else {
        return Error::Rejected {
            status,
            message: String::new(),
        };
    };

    match object.to_registry_error() {
        Some(error) => Error::Remote(error),
        None => Error::Rejected {
            status,
            message: object.message,
        },
    }
}
