use crate::command;
use crate::configuration::ServerConfig;
use crate::registry::server::{Listener, ServerContext};
use crate::registry::Registry;
use argh::FromArgs;
use std::io;
use std::net::SocketAddr;
use tracing::error;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "server", description = "Run the dutex rpc server")]
pub struct Options {
    #[argh(option)]
    /// address the rpc server should bind to, e.g. `127.0.0.1:4000` or `:4000`
    pub address: String,
}

pub struct Command {
    listener: Listener,
}

impl Command {
    pub async fn new(options: &Options, config: &ServerConfig) -> Result<Self, command::Error> {
        let context = ServerContext::new(Registry::new());
        let listener = Listener::bind(&options.address, config, context)
            .await
            .map_err(|err| {
                error!("Unable to bind {}: {err}", options.address);
                err
            })?;

        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> Result<(), command::Error> {
        self.listener.serve().await;
        Ok(())
    }
}
