#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

use crate::command::{lock, server, unlock};
use crate::configuration::{Configuration, ObservabilityConfig};
use argh::FromArgs;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::process::ExitCode;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

mod command;
mod configuration;
mod metrics_provider;
mod registry;

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

fn set_tracing(
    config: Option<&ObservabilityConfig>,
    default_directive: &str,
) -> Result<(), configuration::Error> {
    if let Some(ObservabilityConfig {
        tracing: Some(tracing_config),
    }) = config
    {
        let resource = Resource::builder()
            .with_service_name(env!("CARGO_PKG_NAME"))
            .with_attribute(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")))
            .build();
        let otlp_exporter = SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&tracing_config.endpoint)
            .with_timeout(std::time::Duration::from_secs(10))
            .build()?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(otlp_exporter)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource)
            .with_sampler(Sampler::TraceIdRatioBased(tracing_config.sampling_rate))
            .build();

        let tracer = tracer_provider.tracer("dutex");
        let _ = global::set_tracer_provider(tracer_provider);
        let telemetry = tracing_opentelemetry::layer().with_tracer(tracer);

        let _ = tracing_subscriber::registry()
            .with(env_filter(default_directive))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .with(telemetry)
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(env_filter(default_directive))
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init();
    }
    Ok(())
}

#[derive(FromArgs, PartialEq, Debug)]
/// A single-node advisory lock service with fencing tokens
struct GlobalArguments {
    #[argh(option, short = 'c')]
    /// the path to an optional TOML configuration file
    config: Option<String>,

    #[argh(subcommand)]
    subcommand: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Server(server::Options),
    Lock(lock::Options),
    Unlock(unlock::Options),
}

fn main() -> ExitCode {
    let cli_args: GlobalArguments = argh::from_env();

    match run(cli_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli_args: GlobalArguments) -> Result<(), command::Error> {
    let config = match &cli_args.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.global.max_concurrent_requests)
        .enable_all()
        .build()?
        .block_on(run_command(cli_args, config))
}

async fn run_command(
    cli_args: GlobalArguments,
    config: Configuration,
) -> Result<(), command::Error> {
    match cli_args.subcommand {
        SubCommand::Server(options) => {
            set_tracing(config.observability.as_ref(), "info")?;
            let server = server::Command::new(&options, &config.server).await?;
            server.run().await
        }
        SubCommand::Lock(options) => {
            set_tracing(config.observability.as_ref(), "warn")?;
            let lock = lock::Command::new(&options, &config.client)?;
            lock.run().await
        }
        SubCommand::Unlock(options) => {
            set_tracing(config.observability.as_ref(), "warn")?;
            let unlock = unlock::Command::new(&options, &config.client)?;
            unlock.run().await
        }
    }
}
