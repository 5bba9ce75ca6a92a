//! Docker implementation of EngineClient.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::image::{CreateImageOptions, RemoveImageOptions};
use bollard::service::{HostConfig, PortBinding};
use bollard::Docker;
use futures_util::{stream, Stream, StreamExt};
use tracing::{debug, warn};

use crate::engine::{ByteStream, ClientFactory, ContainerSpec, EngineClient};
use crate::error::{EngineError, EngineResult};

/// Docker-based engine client.
#[derive(Clone)]
pub struct DockerEngine {
    client: Docker,
}

impl DockerEngine {
    /// Wrap an existing bollard client.
    pub fn new(client: Docker) -> Self {
        Self { client }
    }

    /// Connect using `DOCKER_HOST` (unix, tcp, http or https) and falling
    /// back to the local socket, negotiating the API version.
    pub async fn connect() -> EngineResult<Self> {
        let client = Docker::connect_with_defaults()?;
        let client = client.negotiate_version().await?;
        debug!("Negotiated Docker API version");
        Ok(Self { client })
    }

    /// The underlying bollard client.
    pub fn client(&self) -> &Docker {
        &self.client
    }
}

/// Default factory: a `DockerEngine` configured from the environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct DockerClientFactory;

#[async_trait]
impl ClientFactory for DockerClientFactory {
    async fn connect(&self) -> EngineResult<Arc<dyn EngineClient>> {
        let engine = DockerEngine::connect().await?;
        Ok(Arc::new(engine))
    }
}

/// bollard reports a failed request as the first stream item. Surface that as
/// the call's error and replay everything else through `encode`.
async fn into_byte_stream<S, T, F>(source: S, encode: F) -> EngineResult<ByteStream>
where
    S: Stream<Item = Result<T, bollard::errors::Error>> + Send + 'static,
    T: Send + 'static,
    F: Fn(T) -> EngineResult<Vec<u8>> + Send + 'static,
{
    let mut source = Box::pin(source);
    let first = match source.next().await {
        Some(Ok(item)) => Some(Ok(item)),
        Some(Err(e)) => return Err(e.into()),
        None => None,
    };

    let merged = stream::iter(first)
        .chain(source)
        .map(move |item| item.map_err(EngineError::from).and_then(|v| encode(v)));
    Ok(Box::pin(merged))
}

fn to_port_bindings(spec: &ContainerSpec) -> HashMap<String, Option<Vec<PortBinding>>> {
    spec.port_bindings
        .iter()
        .map(|(port, bindings)| {
            let bindings = bindings
                .iter()
                .map(|b| PortBinding {
                    host_ip: Some(b.host_ip.clone()),
                    host_port: Some(b.host_port.clone()),
                })
                .collect();
            (port.clone(), Some(bindings))
        })
        .collect()
}

#[async_trait]
impl EngineClient for DockerEngine {
    async fn pull_image(&self, reference: &str) -> EngineResult<ByteStream> {
        let options = CreateImageOptions {
            from_image: reference.to_string(),
            ..Default::default()
        };
        let progress = self.client.create_image(Some(options), None, None);

        // Re-encode as JSON lines, the form the engine sends on the wire.
        into_byte_stream(progress, |info| {
            let mut line = serde_json::to_vec(&info)?;
            line.push(b'\n');
            Ok(line)
        })
        .await
    }

    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<String> {
        let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
            .port_bindings
            .keys()
            .map(|port| (port.clone(), HashMap::new()))
            .collect();

        let host_config = HostConfig {
            port_bindings: Some(to_port_bindings(spec)),
            auto_remove: Some(spec.auto_remove),
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            tty: Some(spec.tty),
            open_stdin: Some(spec.open_stdin),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        };

        let response = self
            .client
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;

        for warning in &response.warnings {
            warn!(container_id = %response.id, "Docker create warning: {}", warning);
        }

        Ok(response.id)
    }

    async fn start_container(&self, container_id: &str) -> EngineResult<()> {
        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn container_logs(&self, container_id: &str, follow: bool) -> EngineResult<ByteStream> {
        let options = LogsOptions::<String> {
            follow,
            stdout: true,
            stderr: true,
            ..Default::default()
        };
        let logs = self.client.logs(container_id, Some(options));

        into_byte_stream(logs, |output| {
            Ok(match output {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::StdIn { message }
                | LogOutput::Console { message } => message.to_vec(),
            })
        })
        .await
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> EngineResult<()> {
        self.client
            .remove_container(
                container_id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn remove_image(&self, image: &str, force: bool) -> EngineResult<()> {
        let deleted = self
            .client
            .remove_image(
                image,
                Some(RemoveImageOptions {
                    force,
                    ..Default::default()
                }),
                None,
            )
            .await?;
        debug!(image, entries = deleted.len(), "Image removed");
        Ok(())
    }
}
