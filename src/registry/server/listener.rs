use crate::configuration::ServerConfig;
use crate::registry::server::{serve_request, ServerContext};
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub struct Listener {
    listener: TcpListener,
    context: Arc<ServerContext>,
    timeouts: Arc<[Duration; 2]>,
}

impl Listener {
    /// Bind `address` (`host:port`, or `:port` for every interface).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the address cannot be resolved or bound.
    pub async fn bind(
        address: &str,
        server_config: &ServerConfig,
        context: ServerContext,
    ) -> io::Result<Self> {
        let address = if address.starts_with(':') {
            format!("0.0.0.0{address}")
        } else {
            address.to_string()
        };

        let listener = TcpListener::bind(&address).await?;

        let timeouts = [
            Duration::from_secs(server_config.query_timeout),
            Duration::from_secs(server_config.query_timeout_grace_period),
        ];

        Ok(Self {
            listener,
            context: Arc::new(context),
            timeouts: Arc::new(timeouts),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, serving each one on its own task.
    pub async fn serve(self) {
        if let Ok(address) = self.local_addr() {
            info!("Listening on {address}");
        }

        loop {
            debug!("Waiting for incoming connection");
            let (tcp, remote_address) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    error!("Failed to accept connection: {error}");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            debug!("Accepted connection from {remote_address}");
            let stream = TokioIo::new(tcp);
            let context = Arc::clone(&self.context);
            let timeouts = Arc::clone(&self.timeouts);

            tokio::spawn(Box::pin(serve_request(stream, context, timeouts)));
        }
    }
}
