//! Endpoint command - Print the URL for AWS clients.

use anyhow::Result;
use clap::Args;
use localstack_runner::{RunnerConfig, DEFAULT_HOST_PORT};

#[derive(Args)]
pub struct EndpointArgs {
    /// Host port bound to LocalStack's 4566/tcp
    #[arg(long, env = "LOCALSTACK_HOST_PORT", default_value_t = DEFAULT_HOST_PORT)]
    pub host_port: u16,
}

pub fn execute(args: EndpointArgs) -> Result<()> {
    let config = RunnerConfig::new().host_port(args.host_port);
    println!("{}", config.endpoint_url());
    Ok(())
}
