//! Error types for the runner module.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Result type alias for raw engine calls.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by a container engine backend.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Docker API error: {0}")]
    DockerApi(#[from] bollard::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors that can occur while managing the LocalStack container.
///
/// Engine failures keep the originating call and its target so callers can
/// tell a failed pull apart from a rejected create or start.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Docker client init failed: {0}")]
    Initialization(#[source] EngineError),

    #[error("Invalid runner configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to pull image {image}: {source}")]
    ImagePull {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("Failed streaming {what} output: {source}")]
    IoStream {
        what: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("Container create failed for image {image}: {source}")]
    ContainerCreate {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("Container start failed for {container_id}: {source}")]
    ContainerStart {
        container_id: String,
        #[source]
        source: EngineError,
    },

    #[error("Cannot fetch logs for {container_id}: {source}")]
    LogStream {
        container_id: String,
        #[source]
        source: EngineError,
    },

    #[error("Container remove failed for {container_id}: {source}")]
    ContainerRemove {
        container_id: String,
        #[source]
        source: EngineError,
    },

    #[error("Image remove failed for {image}: {source}")]
    ImageRemove {
        image: String,
        #[source]
        source: EngineError,
    },

    #[error("{operation} exceeded its deadline of {timeout:?}")]
    DeadlineExceeded {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },
}

impl RunnerError {
    /// Whether the error came from the deadline or cancellation token rather
    /// than from the engine.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::DeadlineExceeded { .. } | Self::Cancelled { .. }
        )
    }
}
