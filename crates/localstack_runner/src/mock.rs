//! In-memory engine for testing.
//!
//! Provides a scriptable implementation of the EngineClient trait so
//! fixtures built on `Runner` can be exercised without Docker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use parking_lot::RwLock;

use crate::engine::{ByteStream, ContainerSpec, EngineClient};
use crate::error::{EngineError, EngineResult};

/// Engine operations, used to script failures and inspect calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineOp {
    PullImage,
    CreateContainer,
    StartContainer,
    ContainerLogs,
    RemoveContainer,
    RemoveImage,
}

/// Captured call information for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedCall {
    pub op: EngineOp,
    /// Image reference or container ID the call targeted
    pub target: String,
}

/// How a scripted output stream behaves.
#[derive(Debug, Clone, Default)]
struct StreamScript {
    chunks: Vec<Vec<u8>>,
    delay: Option<Duration>,
    read_error: Option<String>,
    stay_open: bool,
}

impl StreamScript {
    fn build(&self, released: Arc<AtomicUsize>) -> ByteStream {
        let delay = self.delay;
        let chunks = stream::iter(self.chunks.clone()).then(move |chunk| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, EngineError>(chunk)
        });
        let tail = stream::iter(
            self.read_error
                .clone()
                .map(|msg| Err(EngineError::Other(msg))),
        );

        let guard = ReleaseGuard(released);
        let body = chunks.chain(tail).map(move |item| {
            let _guard = &guard;
            item
        });

        if self.stay_open {
            Box::pin(body.chain(stream::pending()))
        } else {
            Box::pin(body)
        }
    }
}

/// Counts streams dropped by the consumer.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fake container engine for testing.
///
/// Records every call, hands out deterministic 64-character container IDs,
/// and tracks which containers and images "exist".
#[derive(Clone, Default)]
pub struct FakeEngine {
    pull: Arc<RwLock<StreamScript>>,
    logs: Arc<RwLock<StreamScript>>,
    failures: Arc<RwLock<HashMap<EngineOp, String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    created_specs: Arc<RwLock<Vec<ContainerSpec>>>,
    containers: Arc<RwLock<Vec<String>>>,
    images: Arc<RwLock<Vec<String>>>,
    next_id: Arc<AtomicUsize>,
    streams_opened: Arc<AtomicUsize>,
    streams_released: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunks emitted by the pull progress stream.
    pub fn pull_output(self, chunks: Vec<Vec<u8>>) -> Self {
        self.pull.write().chunks = chunks;
        self
    }

    /// Sleep before each pull progress chunk.
    pub fn pull_delay(self, delay: Duration) -> Self {
        self.pull.write().delay = Some(delay);
        self
    }

    /// Fail reading the pull stream after its chunks.
    pub fn pull_read_error(self, message: impl Into<String>) -> Self {
        self.pull.write().read_error = Some(message.into());
        self
    }

    /// Chunks emitted by the log stream.
    pub fn log_output(self, chunks: Vec<Vec<u8>>) -> Self {
        self.logs.write().chunks = chunks;
        self
    }

    /// Fail reading the log stream after its chunks.
    pub fn log_read_error(self, message: impl Into<String>) -> Self {
        self.logs.write().read_error = Some(message.into());
        self
    }

    /// Keep the followed log stream open after its chunks, like a running
    /// container that has gone quiet.
    pub fn logs_stay_open(self) -> Self {
        self.logs.write().stay_open = true;
        self
    }

    /// Make `op` fail with `message`.
    pub fn fail_on(self, op: EngineOp, message: impl Into<String>) -> Self {
        self.failures.write().insert(op, message.into());
        self
    }

    /// Get all captured calls.
    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    /// Operations called, in order.
    pub fn ops(&self) -> Vec<EngineOp> {
        self.captured_calls.read().iter().map(|c| c.op).collect()
    }

    /// Check if an operation was called.
    pub fn was_called(&self, op: EngineOp) -> bool {
        self.captured_calls.read().iter().any(|c| c.op == op)
    }

    /// Specs passed to `create_container`.
    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.created_specs.read().clone()
    }

    /// IDs of containers currently present.
    pub fn containers(&self) -> Vec<String> {
        self.containers.read().clone()
    }

    /// Images currently present.
    pub fn images(&self) -> Vec<String> {
        self.images.read().clone()
    }

    /// Streams handed out that have not been dropped yet.
    pub fn open_streams(&self) -> usize {
        self.streams_opened.load(Ordering::SeqCst) - self.streams_released.load(Ordering::SeqCst)
    }

    fn record_call(&self, op: EngineOp, target: &str) {
        self.captured_calls.write().push(CapturedCall {
            op,
            target: target.to_string(),
        });
    }

    fn check_failure(&self, op: EngineOp) -> EngineResult<()> {
        match self.failures.read().get(&op) {
            Some(msg) => Err(EngineError::Other(msg.clone())),
            None => Ok(()),
        }
    }

    fn open_stream(&self, script: &StreamScript) -> ByteStream {
        self.streams_opened.fetch_add(1, Ordering::SeqCst);
        script.build(self.streams_released.clone())
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn pull_image(&self, reference: &str) -> EngineResult<ByteStream> {
        self.record_call(EngineOp::PullImage, reference);
        self.check_failure(EngineOp::PullImage)?;
        self.images.write().push(reference.to_string());
        let script = self.pull.read().clone();
        Ok(self.open_stream(&script))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> EngineResult<String> {
        self.record_call(EngineOp::CreateContainer, &spec.image);
        self.created_specs.write().push(spec.clone());
        self.check_failure(EngineOp::CreateContainer)?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("{:064x}", n);
        self.containers.write().push(id.clone());
        Ok(id)
    }

    async fn start_container(&self, container_id: &str) -> EngineResult<()> {
        self.record_call(EngineOp::StartContainer, container_id);
        self.check_failure(EngineOp::StartContainer)?;
        if !self.containers.read().iter().any(|c| c == container_id) {
            return Err(EngineError::Other(format!(
                "No such container: {}",
                container_id
            )));
        }
        Ok(())
    }

    async fn container_logs(&self, container_id: &str, _follow: bool) -> EngineResult<ByteStream> {
        self.record_call(EngineOp::ContainerLogs, container_id);
        self.check_failure(EngineOp::ContainerLogs)?;
        let script = self.logs.read().clone();
        Ok(self.open_stream(&script))
    }

    async fn remove_container(&self, container_id: &str, _force: bool) -> EngineResult<()> {
        self.record_call(EngineOp::RemoveContainer, container_id);
        self.check_failure(EngineOp::RemoveContainer)?;
        let mut containers = self.containers.write();
        let before = containers.len();
        containers.retain(|c| c != container_id);
        if containers.len() == before {
            return Err(EngineError::Other(format!(
                "No such container: {}",
                container_id
            )));
        }
        Ok(())
    }

    async fn remove_image(&self, image: &str, _force: bool) -> EngineResult<()> {
        self.record_call(EngineOp::RemoveImage, image);
        self.check_failure(EngineOp::RemoveImage)?;
        self.images.write().retain(|i| !i.contains(image));
        Ok(())
    }
}
