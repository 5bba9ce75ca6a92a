//! # localstack_runner
//!
//! Starts and manages a single LocalStack container as a fixture for
//! integration tests.
//!
//! # Features
//!
//! - **Lifecycle**: pull, create with a fixed `127.0.0.1:4566` binding, start
//! - **Deadline**: pull + create + start bounded to two minutes
//! - **Cancellation**: every operation honours a `CancellationToken`
//! - **Log Streaming**: follow container output until cancelled
//! - **Pluggable Engine**: Docker (bollard) by default, any `EngineClient` otherwise
//! - **Fake Engine**: For testing without actual containers
//!
//! The runner does not roll back partial failures. A container that was
//! created but failed to start stays behind, and a started container lives
//! until it is stopped (the engine then auto-removes it). Call
//! [`Runner::remove_container`] when the test is done.
//!
//! # Example
//!
//! ```rust,no_run
//! use localstack_runner::Runner;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Build a Docker client from the environment
//!     let runner = Runner::new(None).await?;
//!
//!     let cancel = CancellationToken::new();
//!     let container_id = runner.start(&cancel).await?;
//!     println!("LocalStack at {} ({})", runner.endpoint_url(), container_id);
//!
//!     // ... run tests against the endpoint ...
//!
//!     runner.remove_container(&container_id).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod docker;
pub mod engine;
pub mod error;
pub mod mock;
pub mod runner;

pub use config::{
    HostBinding, PortMap, RunnerConfig, DEFAULT_HOST_IP, DEFAULT_HOST_PORT, DEFAULT_IMAGE,
    DEFAULT_IMAGE_URL, ENTRY_PORT, OPERATION_TIMEOUT,
};
pub use docker::{DockerClientFactory, DockerEngine};
pub use engine::{ByteStream, ClientFactory, ContainerSpec, EngineClient};
pub use error::{EngineError, EngineResult, RunnerError, RunnerResult};
pub use mock::{CapturedCall, EngineOp, FakeEngine};
pub use runner::Runner;

pub use tokio_util::sync::CancellationToken;
