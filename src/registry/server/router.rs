use crate::registry::message::{LOCK_PATH, UNLOCK_PATH};
use hyper::{Method, Uri};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Route {
    Lock,
    Unlock,
    Healthz,
    Metrics,
    MethodNotAllowed,
    Unknown,
}

pub fn parse(method: &Method, uri: &Uri) -> Route {
    let (route, allowed) = match uri.path() {
        LOCK_PATH => (Route::Lock, Method::POST),
        UNLOCK_PATH => (Route::Unlock, Method::POST),
        "/healthz" => (Route::Healthz, Method::GET),
        "/metrics" => (Route::Metrics, Method::GET),
        _ => return Route::Unknown,
    };

    if *method == allowed {
        route
    } else {
        Route::MethodNotAllowed
    }
}
