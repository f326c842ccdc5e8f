use crate::command;
use crate::configuration::{self, ClientConfig};
use crate::registry::client::Client;
use crate::registry::Lifetime;
use argh::FromArgs;
use std::time::Duration;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "lock", description = "Call the lock rpc")]
pub struct Options {
    #[argh(option)]
    /// address of the rpc server
    pub address: String,

    #[argh(option)]
    /// name of the resource to lock
    pub resource: String,

    #[argh(option, default = "String::from(\"1m\")")]
    /// maximum time the lock will be held for, defaults to `1m`
    pub lifetime: String,
}

pub struct Command {
    client: Client,
    resource: String,
    lifetime: Lifetime,
}

impl Command {
    pub fn new(options: &Options, config: &ClientConfig) -> Result<Self, configuration::Error> {
        command::check_resource(&options.resource)?;
        let lifetime: Lifetime = options.lifetime.parse()?;
        let client = Client::new(&options.address, Duration::from_secs(config.connect_timeout));

        Ok(Self {
            client,
            resource: options.resource.clone(),
            lifetime,
        })
    }

    pub async fn execute(&self) -> Result<String, command::Error> {
        let version = self.client.lock(&self.resource, self.lifetime).await?;
        Ok(format!(
            "Successfully locked {} version {version}.",
            self.resource
        ))
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        println!("{}", self.execute().await?);
        Ok(())
    }
}
