use crate::command;
use crate::configuration::{self, ClientConfig};
use crate::registry::client::Client;
use argh::FromArgs;
use std::time::Duration;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "unlock", description = "Call the unlock rpc")]
pub struct Options {
    #[argh(option)]
    /// address of the rpc server
    pub address: String,

    #[argh(option)]
    /// name of the resource to unlock
    pub resource: String,

    #[argh(option)]
    /// the version returned when the resource was locked
    pub version: u64,
}

pub struct Command {
    client: Client,
    resource: String,
    version: u64,
}

impl Command {
    pub fn new(options: &Options, config: &ClientConfig) -> Result<Self, configuration::Error> {
        command::check_resource(&options.resource)?;
        let client = Client::new(&options.address, Duration::from_secs(config.connect_timeout));

        Ok(Self {
            client,
            resource: options.resource.clone(),
            version: options.version,
        })
    }

    pub async fn execute(&self) -> Result<String, command::Error> {
        self.client.unlock(&self.resource, self.version).await?;
        Ok(format!(
            "Successfully unlocked {} version {}.",
            self.resource, self.version
        ))
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        println!("{}", self.execute().await?);
        Ok(())
    }
}
