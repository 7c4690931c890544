use crate::domain::CleanupError;

/// Environment variable selecting the daemon endpoint.
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";

/// Endpoint used when `DOCKER_HOST` is unset or empty.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Per-request timeout handed to the Docker client, in seconds.
pub const CLIENT_TIMEOUT_SECS: u64 = 120;

/// Runtime settings gathered from flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint: String,
    pub debug: bool,
    pub strict: bool,
}

impl Settings {
    pub fn new(host: Option<&str>, debug: bool, strict: bool) -> Self {
        Self {
            endpoint: resolve_endpoint(host),
            debug,
            strict,
        }
    }
}

/// Falls back to the local socket when no usable host was given.
pub fn resolve_endpoint(host: Option<&str>) -> String {
    host.map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_DOCKER_HOST)
        .to_string()
}

/// Transport selected by a `DOCKER_HOST` style address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Path of a Unix domain socket
    Unix(String),
    /// `http://host:port` address
    Http(String),
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, CleanupError> {
        if let Some(path) = raw.strip_prefix("unix://") {
            if !path.is_empty() {
                return Ok(Self::Unix(path.to_string()));
            }
        }

        if let Some(addr) = raw
            .strip_prefix("tcp://")
            .or_else(|| raw.strip_prefix("http://"))
        {
            if !addr.is_empty() {
                return Ok(Self::Http(format!("http://{addr}")));
            }
        }

        Err(CleanupError::UnsupportedEndpoint(raw.to_string()))
    }
}
