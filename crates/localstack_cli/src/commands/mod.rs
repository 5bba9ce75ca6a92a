//! CLI command definitions.
//!
//! Each subcommand maps to one step of the LocalStack fixture lifecycle.

use clap::{Args, Parser, Subcommand};
use localstack_runner::{RunnerConfig, DEFAULT_HOST_PORT, DEFAULT_IMAGE, DEFAULT_IMAGE_URL};

pub mod endpoint;
pub mod logs;
pub mod start;
pub mod stop;

/// localstack - start and tear down a LocalStack test container
#[derive(Parser)]
#[command(name = "localstack")]
#[command(version, about = "Start and tear down a LocalStack test container")]
#[command(long_about = r#"
Starts a single LocalStack container through the Docker API for use as an
integration-test fixture, and removes it again afterwards.

WORKFLOW:
  start     → Pull the image, create and start the container, print its ID
  logs      → Follow the container's output until Ctrl-C
  stop      → Force-remove the container (and optionally the image)
  endpoint  → Print the URL clients should use

The Docker connection is read from DOCKER_HOST and related variables.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Container engine unavailable
  3 - Container lifecycle failure
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Pull, create and start LocalStack
    Start(start::StartArgs),

    /// Follow a container's logs
    Logs(logs::LogsArgs),

    /// Remove a LocalStack container
    Stop(stop::StopArgs),

    /// Print the LocalStack endpoint URL
    Endpoint(endpoint::EndpointArgs),
}

/// Image and port settings shared by the commands that build a runner.
#[derive(Args, Debug, Clone)]
pub struct ImageArgs {
    /// Image reference to pull
    #[arg(long, env = "LOCALSTACK_IMAGE_URL", default_value = DEFAULT_IMAGE_URL)]
    pub image_url: String,

    /// Image name used to create the container
    #[arg(long, env = "LOCALSTACK_IMAGE", default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Host port bound to LocalStack's 4566/tcp
    #[arg(long, env = "LOCALSTACK_HOST_PORT", default_value_t = DEFAULT_HOST_PORT)]
    pub host_port: u16,
}

impl ImageArgs {
    pub fn to_config(&self) -> RunnerConfig {
        RunnerConfig::new()
            .image_url(self.image_url.clone())
            .image(self.image.clone())
            .host_port(self.host_port)
    }
}
