//! LocalStack lifecycle: pull, create, start, stream logs, tear down.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{PortMap, RunnerConfig};
use crate::docker::DockerClientFactory;
use crate::engine::{ByteStream, ClientFactory, ContainerSpec, EngineClient};
use crate::error::{EngineError, EngineResult, RunnerError, RunnerResult};

/// Encapsulates the config and engine handle needed to run LocalStack.
///
/// The engine handle is shared with the caller. `Runner` never closes it;
/// dropping the last `Arc` is the caller's business.
#[derive(Clone)]
pub struct Runner {
    client: Arc<dyn EngineClient>,
    config: RunnerConfig,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner with the default LocalStack settings.
    ///
    /// When `client` is `None`, a Docker client is built from the environment
    /// with API version negotiation.
    pub async fn new(client: Option<Arc<dyn EngineClient>>) -> RunnerResult<Self> {
        Self::build(client, &DockerClientFactory, RunnerConfig::default()).await
    }

    /// Like [`Runner::new`], with overridden settings.
    pub async fn with_config(
        client: Option<Arc<dyn EngineClient>>,
        config: RunnerConfig,
    ) -> RunnerResult<Self> {
        Self::build(client, &DockerClientFactory, config).await
    }

    /// Like [`Runner::new`], but the default client comes from `factory`.
    pub async fn with_factory(
        client: Option<Arc<dyn EngineClient>>,
        factory: &dyn ClientFactory,
    ) -> RunnerResult<Self> {
        Self::build(client, factory, RunnerConfig::default()).await
    }

    async fn build(
        client: Option<Arc<dyn EngineClient>>,
        factory: &dyn ClientFactory,
        config: RunnerConfig,
    ) -> RunnerResult<Self> {
        config.validate()?;

        let client = match client {
            Some(client) => client,
            None => factory
                .connect()
                .await
                .map_err(RunnerError::Initialization)?,
        };

        Ok(Self { client, config })
    }

    pub fn client(&self) -> &Arc<dyn EngineClient> {
        &self.client
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn image_url(&self) -> &str {
        &self.config.image_url
    }

    pub fn image(&self) -> &str {
        &self.config.image
    }

    pub fn host_port(&self) -> u16 {
        self.config.host_port
    }

    pub fn port_bindings(&self) -> PortMap {
        self.config.port_bindings()
    }

    pub fn endpoint_url(&self) -> String {
        self.config.endpoint_url()
    }

    /// The create request: interactive TTY with stdin open so the container
    /// stays up without a command, auto-removed once stopped.
    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.config.image.clone(),
            tty: true,
            open_stdin: true,
            port_bindings: self.config.port_bindings(),
            auto_remove: true,
        }
    }

    /// Pull the image, create and start the container, and return its ID.
    /// Pull progress goes to stdout.
    pub async fn start(&self, cancel: &CancellationToken) -> RunnerResult<String> {
        let mut stdout = tokio::io::stdout();
        self.start_with_sink(cancel, &mut stdout).await
    }

    /// [`Runner::start`] with pull progress written to `sink`.
    ///
    /// Pull, create and start share one deadline of
    /// `config.operation_timeout`, independent of how long `cancel` lives.
    /// Nothing is rolled back on failure: a container that was created but
    /// failed to start is left in place.
    pub async fn start_with_sink<W>(
        &self,
        cancel: &CancellationToken,
        sink: &mut W,
    ) -> RunnerResult<String>
    where
        W: AsyncWrite + Unpin + Send,
    {
        const OPERATION: &str = "start";

        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled {
                operation: OPERATION,
            });
        }

        let timeout = self.config.operation_timeout;
        let lifecycle = async {
            self.pull_image(sink).await?;
            self.create_and_start().await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunnerError::Cancelled { operation: OPERATION }),
            result = tokio::time::timeout(timeout, lifecycle) => match result {
                Ok(result) => result,
                Err(_) => Err(RunnerError::DeadlineExceeded {
                    operation: OPERATION,
                    timeout,
                }),
            },
        }
    }

    async fn pull_image<W>(&self, sink: &mut W) -> RunnerResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let image_url = &self.config.image_url;
        info!(image = %image_url, "Pulling image");

        let progress = self
            .client
            .pull_image(image_url)
            .await
            .map_err(|source| RunnerError::ImagePull {
                image: image_url.clone(),
                source,
            })?;

        let copied = copy_stream(progress, sink)
            .await
            .map_err(|source| RunnerError::IoStream {
                what: "pull",
                source,
            })?;

        debug!(image = %image_url, bytes = copied, "Image pulled");
        Ok(())
    }

    async fn create_and_start(&self) -> RunnerResult<String> {
        let spec = self.container_spec();

        let container_id = self
            .client
            .create_container(&spec)
            .await
            .map_err(|source| RunnerError::ContainerCreate {
                image: spec.image.clone(),
                source,
            })?;
        if container_id.is_empty() {
            return Err(RunnerError::ContainerCreate {
                image: spec.image.clone(),
                source: EngineError::Other("engine returned an empty container ID".to_string()),
            });
        }
        debug!(container_id = %container_id, image = %spec.image, "Container created");

        self.client
            .start_container(&container_id)
            .await
            .map_err(|source| RunnerError::ContainerStart {
                container_id: container_id.clone(),
                source,
            })?;

        info!(
            container_id = %container_id,
            endpoint = %self.endpoint_url(),
            "LocalStack container started"
        );
        Ok(container_id)
    }

    /// Follow the container's combined stdout/stderr to stdout until the
    /// stream ends or `cancel` fires.
    pub async fn stream_logs(
        &self,
        cancel: &CancellationToken,
        container_id: &str,
    ) -> RunnerResult<()> {
        let mut stdout = tokio::io::stdout();
        self.stream_logs_to(cancel, container_id, &mut stdout).await
    }

    /// [`Runner::stream_logs`] into `sink`.
    ///
    /// Returns `Ok` when the engine closes the stream and
    /// [`RunnerError::Cancelled`] as soon as `cancel` fires, even when the
    /// stream is idle.
    pub async fn stream_logs_to<W>(
        &self,
        cancel: &CancellationToken,
        container_id: &str,
        sink: &mut W,
    ) -> RunnerResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        const OPERATION: &str = "stream_logs";

        if cancel.is_cancelled() {
            return Err(RunnerError::Cancelled {
                operation: OPERATION,
            });
        }

        let copy = async {
            let logs = self
                .client
                .container_logs(container_id, true)
                .await
                .map_err(|source| RunnerError::LogStream {
                    container_id: container_id.to_string(),
                    source,
                })?;

            debug!(container_id, "Following container logs");
            copy_stream(logs, sink)
                .await
                .map_err(|source| RunnerError::IoStream {
                    what: "log",
                    source,
                })
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RunnerError::Cancelled { operation: OPERATION }),
            result = copy => result.map(|copied| {
                debug!(container_id, bytes = copied, "Log stream closed");
            }),
        }
    }

    /// Stop and delete a container.
    pub async fn remove_container(&self, container_id: &str) -> RunnerResult<()> {
        self.client
            .remove_container(container_id, true)
            .await
            .map_err(|source| RunnerError::ContainerRemove {
                container_id: container_id.to_string(),
                source,
            })?;
        info!(container_id, "Container removed");
        Ok(())
    }

    /// Delete the LocalStack image from the local cache.
    pub async fn remove_image(&self) -> RunnerResult<()> {
        let image = &self.config.image;
        self.client
            .remove_image(image, true)
            .await
            .map_err(|source| RunnerError::ImageRemove {
                image: image.clone(),
                source,
            })?;
        info!(image = %image, "Image removed");
        Ok(())
    }
}

/// Copy chunks into `sink` as they arrive. The stream is dropped, closing it,
/// on every return path.
async fn copy_stream<W>(mut stream: ByteStream, sink: &mut W) -> EngineResult<u64>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut copied = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        sink.flush().await?;
        copied += chunk.len() as u64;
    }
    Ok(copied)
}
