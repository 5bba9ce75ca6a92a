//! Logs command - Follow a container's output.

use anyhow::{Context, Result};
use clap::Args;
use localstack_runner::{CancellationToken, Runner, RunnerError};

#[derive(Args)]
pub struct LogsArgs {
    /// Container ID printed by `start`
    pub container_id: String,
}

pub async fn execute(args: LogsArgs, cancel: &CancellationToken) -> Result<()> {
    let runner = Runner::new(None).await?;

    match runner.stream_logs(cancel, &args.container_id).await {
        Ok(()) | Err(RunnerError::Cancelled { .. }) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("following logs of {}", args.container_id)),
    }
}
