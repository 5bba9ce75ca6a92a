//! Start command - Pull, create and start LocalStack.

use anyhow::{Context, Result};
use clap::Args;
use localstack_runner::{CancellationToken, Runner, RunnerError};
use tracing::{info, warn};

use super::ImageArgs;

#[derive(Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Follow container logs after starting, until Ctrl-C
    #[arg(short, long)]
    pub follow: bool,

    /// With --follow, remove the container when following stops
    #[arg(long, requires = "follow")]
    pub cleanup: bool,
}

pub async fn execute(args: StartArgs, cancel: &CancellationToken) -> Result<()> {
    let runner = Runner::with_config(None, args.image.to_config()).await?;
    run(&runner, &args, cancel).await.map(|_| ())
}

/// Start, then optionally follow and clean up. Returns the container ID.
async fn run(runner: &Runner, args: &StartArgs, cancel: &CancellationToken) -> Result<String> {
    let container_id = runner
        .start(cancel)
        .await
        .with_context(|| format!("starting {}", runner.image_url()))?;

    info!(endpoint = %runner.endpoint_url(), "LocalStack is up");
    println!("{}", container_id);

    if !args.follow {
        return Ok(container_id);
    }

    let followed = match runner.stream_logs(cancel, &container_id).await {
        Ok(()) | Err(RunnerError::Cancelled { .. }) => Ok(()),
        Err(e) => Err(e),
    };

    if args.cleanup {
        if let Err(e) = runner.remove_container(&container_id).await {
            warn!(container_id = %container_id, "Cleanup failed: {}", e);
        }
    }

    followed.with_context(|| format!("following logs of {}", container_id))?;
    Ok(container_id)
}
