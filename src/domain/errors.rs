use thiserror::Error;

/// Typed failures raised by the domain layer and the daemon bootstrap.
#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("invalid identifier '{0}': expected at least 12 characters")]
    InvalidIdentifier(String),

    #[error("could not connect to Docker daemon at {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    #[error("unsupported DOCKER_HOST endpoint '{0}' (expected unix://, tcp:// or http://)")]
    UnsupportedEndpoint(String),
}
