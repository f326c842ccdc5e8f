mod body;
mod error;
pub mod http_server;
pub mod listener;
pub mod response_body;
mod router;
pub mod server_context;

pub use error::Error;
pub use http_server::serve_request;
pub use listener::Listener;
pub use response_body::ResponseBody;
pub use server_context::ServerContext;
