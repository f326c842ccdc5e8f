use crate::metrics_provider::{IN_FLIGHT_REQUESTS, METRICS_PROVIDER};
use crate::registry::message::{LockReply, LockRequest, UnlockReply, UnlockRequest};
use crate::registry::server::body::read_json;
use crate::registry::server::router::{self, Route};
use crate::registry::server::{Error, ResponseBody, ServerContext};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use opentelemetry::trace::TraceContextExt;
use serde::Serialize;
use std::convert::Infallible;
use std::fmt::Debug;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::pin;
use tracing::{debug, error, info, instrument, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub async fn serve_request<S>(
    stream: TokioIo<S>,
    context: Arc<ServerContext>,
    timeouts: Arc<[Duration; 2]>,
) where
    S: Unpin + AsyncWrite + AsyncRead + Send + Debug + 'static,
{
    let conn = http1::Builder::new().serve_connection(
        stream,
        service_fn(move |request| handle_request(Arc::clone(&context), request)),
    );
    pin!(conn);

    IN_FLIGHT_REQUESTS.fetch_add(1, Ordering::Relaxed);
    METRICS_PROVIDER.metric_http_request_in_flight.set(
        i64::try_from(IN_FLIGHT_REQUESTS.load(Ordering::Relaxed)).unwrap_or(i64::MAX),
    );

    for (iter, sleep_duration) in timeouts.iter().enumerate() {
        debug!("iter = {iter} sleep_duration = {sleep_duration:?}");
        tokio::select! {
            res = conn.as_mut() => {
                match res {
                    Ok(()) => debug!("after polling conn, no error"),
                    Err(error) =>  debug!("error serving connection: {error}"),
                }
                break;
            }
            () = tokio::time::sleep(*sleep_duration) => {
                debug!("iter = {iter} got timeout_interval, calling conn.graceful_shutdown");
                conn.as_mut().graceful_shutdown();
            }
        }
    }

    IN_FLIGHT_REQUESTS.fetch_sub(1, Ordering::Relaxed);
    METRICS_PROVIDER.metric_http_request_in_flight.set(
        i64::try_from(IN_FLIGHT_REQUESTS.load(Ordering::Relaxed)).unwrap_or(i64::MAX),
    );
}

#[instrument(skip(context, request))]
async fn handle_request(
    context: Arc<ServerContext>,
    request: Request<Incoming>,
) -> Result<Response<ResponseBody>, Infallible> {
    let start_time = Instant::now();
    let method = request.method().to_owned();
    let path = request.uri().path().to_owned();

    let trace_id = {
        let context = Span::current().context();
        let span = context.span();
        let span_context = span.span_context();
        if span_context.is_valid() {
            Some(span_context.trace_id().to_string())
        } else {
            None
        }
    };

    let response = match router(&context, request).await {
        Ok(response) => response,
        Err(error) => error_to_response(&error, trace_id.as_ref()),
    };

    #[allow(clippy::cast_precision_loss)]
    let elapsed = start_time.elapsed().as_millis() as f64;
    let status = response.status();

    METRICS_PROVIDER.metric_http_request_total.inc();
    METRICS_PROVIDER
        .metric_http_request_duration
        .observe(elapsed);

    let log = if let Some(trace_id) = trace_id {
        format!("{trace_id} {elapsed:?} - {status} {method} {path}")
    } else {
        format!("{elapsed:?} - {status} {method} {path}")
    };

    if status.is_server_error() {
        error!("{log}");
    } else {
        info!("{log}");
    }

    Ok(response)
}

#[instrument(skip(context, request))]
async fn router(
    context: &ServerContext,
    request: Request<Incoming>,
) -> Result<Response<ResponseBody>, Error> {
    let (parts, incoming) = request.into_parts();

    match router::parse(&parts.method, &parts.uri) {
        Route::Lock => {
            let request: LockRequest = read_json(incoming).await?;
            check_resource(&request.resource)?;

            let version = context.lock(&request.resource, request.lifetime).await?;
            json_response(StatusCode::OK, &LockReply { version })
        }
        Route::Unlock => {
            let request: UnlockRequest = read_json(incoming).await?;
            check_resource(&request.resource)?;

            context.unlock(&request.resource, request.version).await?;
            json_response(StatusCode::OK, &UnlockReply::default())
        }
        Route::Healthz => Ok(fixed_response(
            StatusCode::OK,
            "application/json",
            br#"{"status":"ok"}"#.to_vec(),
        )),
        Route::Metrics => {
            context.update_gauges().await;
            let (content_type, metrics) = METRICS_PROVIDER.gather()?;
            let mut response = fixed_response(StatusCode::OK, "text/plain", metrics);
            if let Ok(content_type) = HeaderValue::from_str(&content_type) {
                response.headers_mut().insert(CONTENT_TYPE, content_type);
            }
            Ok(response)
        }
        Route::MethodNotAllowed => Err(Error::MethodNotAllowed),
        Route::Unknown => Err(Error::NotFound),
    }
}

fn check_resource(resource: &str) -> Result<(), Error> {
    if resource.is_empty() {
        return Err(Error::BadRequest("resource name must not be empty".to_string()));
    }
    Ok(())
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<ResponseBody>, Error> {
    let body = serde_json::to_vec(body)?;
    Ok(fixed_response(status, "application/json", body))
}

fn fixed_response(
    status: StatusCode,
    content_type: &'static str,
    body: Vec<u8>,
) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::fixed(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

pub fn error_to_response(error: &Error, trace_id: Option<&String>) -> Response<ResponseBody> {
    let reply = error.as_reply(trace_id);
    // an ErrorReply only holds strings and integers
    let body = serde_json::to_vec(&reply).unwrap_or_default();

    fixed_response(error.status_code(), "application/json", body)
}
