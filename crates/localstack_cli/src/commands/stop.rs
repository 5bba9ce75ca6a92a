//! Stop command - Remove the container and optionally its image.

use anyhow::{Context, Result};
use clap::Args;
use localstack_runner::Runner;

use super::ImageArgs;

#[derive(Args)]
pub struct StopArgs {
    /// Container ID printed by `start`
    pub container_id: String,

    /// Also remove the LocalStack image
    #[arg(long)]
    pub remove_image: bool,

    #[command(flatten)]
    pub image: ImageArgs,
}

pub async fn execute(args: StopArgs) -> Result<()> {
    let runner = Runner::with_config(None, args.image.to_config()).await?;

    runner
        .remove_container(&args.container_id)
        .await
        .with_context(|| format!("removing {}", args.container_id))?;

    if args.remove_image {
        runner.remove_image().await?;
    }

    Ok(())
}
