use crate::registry::server::Error;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use serde::de::DeserializeOwned;
use tracing::warn;

pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Collect a request body of at most `MAX_BODY_SIZE` bytes and decode it as JSON.
pub async fn read_json<T, B>(body: B) -> Result<T, Error>
where
    T: DeserializeOwned,
    B: Body<Data = Bytes>,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    let body = Limited::new(body, MAX_BODY_SIZE)
        .collect()
        .await
        .map_err(|error| {
            warn!("Unable to read request body: {error}");
            Error::BadRequest(format!("Unable to read request body: {error}"))
        })?
        .to_bytes();

    serde_json::from_slice(&body).map_err(|error| {
        warn!("Invalid request body: {error}");
        Error::BadRequest(format!("Invalid request body: {error}"))
    })
}
