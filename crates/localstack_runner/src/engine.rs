//! Container engine capability used by the runner.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;

use crate::config::PortMap;
use crate::error::EngineResult;

/// Raw diagnostic output from the engine, consumed incrementally.
///
/// Dropping the stream closes the underlying connection.
pub type ByteStream = Pin<Box<dyn Stream<Item = EngineResult<Vec<u8>>> + Send>>;

/// What the runner asks the engine to create.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    /// Image the container is created from
    pub image: String,
    /// Allocate a pseudo-TTY
    pub tty: bool,
    /// Keep stdin open
    pub open_stdin: bool,
    /// Published ports
    pub port_bindings: PortMap,
    /// Delete the container once it stops
    pub auto_remove: bool,
}

/// Engine operations the runner depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineClient: Send + Sync {
    /// Request an image pull. Errors here mean the request itself failed;
    /// errors while reading progress arrive on the stream.
    async fn pull_image(&self, reference: &str) -> EngineResult<ByteStream>;

    /// Create a container and return its ID.
    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<String>;

    /// Start a created container.
    async fn start_container(&self, container_id: &str) -> EngineResult<()>;

    /// Combined stdout/stderr of a container.
    async fn container_logs(&self, container_id: &str, follow: bool) -> EngineResult<ByteStream>;

    /// Remove a container, stopping it first when `force` is set.
    async fn remove_container(&self, container_id: &str, force: bool) -> EngineResult<()>;

    /// Remove a local image.
    async fn remove_image(&self, image: &str, force: bool) -> EngineResult<()>;
}

/// Builds the default engine client when the caller does not supply one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn connect(&self) -> EngineResult<Arc<dyn EngineClient>>;
}
