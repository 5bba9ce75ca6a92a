//! Runner configuration types.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Image reference pulled from the registry, including tag.
pub const DEFAULT_IMAGE_URL: &str = "docker.io/localstack/localstack:latest";

/// Image reference used when creating the container.
pub const DEFAULT_IMAGE: &str = "localstack/localstack";

/// The single service port LocalStack exposes.
pub const ENTRY_PORT: &str = "4566/tcp";

/// Host port bound to the entry port.
pub const DEFAULT_HOST_PORT: u16 = 4566;

/// Host address the entry port is published on.
pub const DEFAULT_HOST_IP: &str = "127.0.0.1";

/// Ceiling for pull + create + start.
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// A single host-side binding for a container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostBinding {
    pub host_ip: String,
    pub host_port: String,
}

/// Container port (`"4566/tcp"`) to host bindings.
pub type PortMap = HashMap<String, Vec<HostBinding>>;

/// Everything needed to start LocalStack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Reference passed to the image pull
    pub image_url: String,
    /// Image name used at container creation
    pub image: String,
    /// Host port bound to the service port
    pub host_port: u16,
    /// Host address bound to the service port
    pub host_ip: String,
    /// Service port inside the container
    pub container_port: String,
    /// Deadline for pull + create + start, in milliseconds on the wire
    #[serde(rename = "operation_timeout_ms", with = "duration_millis")]
    pub operation_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            image_url: DEFAULT_IMAGE_URL.to_string(),
            image: DEFAULT_IMAGE.to_string(),
            host_port: DEFAULT_HOST_PORT,
            host_ip: DEFAULT_HOST_IP.to_string(),
            container_port: ENTRY_PORT.to_string(),
            operation_timeout: OPERATION_TIMEOUT,
        }
    }
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn host_port(mut self, port: u16) -> Self {
        self.host_port = port;
        self
    }

    pub fn host_ip(mut self, ip: impl Into<String>) -> Self {
        self.host_ip = ip.into();
        self
    }

    pub fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Build the port-mapping table: exactly one entry, for the service port.
    pub fn port_bindings(&self) -> PortMap {
        let mut map = PortMap::new();
        map.insert(
            self.container_port.clone(),
            vec![HostBinding {
                host_ip: self.host_ip.clone(),
                host_port: self.host_port.to_string(),
            }],
        );
        map
    }

    /// URL clients use to reach the emulated services.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}", self.host_ip, self.host_port)
    }

    /// Check the invariants `Runner` relies on.
    pub fn validate(&self) -> RunnerResult<()> {
        if self.image_url.trim().is_empty() {
            return Err(RunnerError::InvalidConfig("image_url is empty".into()));
        }
        if self.image.trim().is_empty() {
            return Err(RunnerError::InvalidConfig("image is empty".into()));
        }
        if self.container_port.trim().is_empty() {
            return Err(RunnerError::InvalidConfig("container_port is empty".into()));
        }
        if self.operation_timeout.is_zero() {
            return Err(RunnerError::InvalidConfig(
                "operation_timeout must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
