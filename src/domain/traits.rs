use super::{Container, DaemonEvent, DaemonVersion, Image};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::SystemTime;
use tokio::sync::mpsc;

/// Trait for the container-engine daemon operations the cleanup needs
#[async_trait]
pub trait DaemonGateway: Send + Sync + Debug {
    /// Query daemon version and platform information
    async fn version(&self) -> Result<DaemonVersion>;

    /// List every container, including stopped ones
    async fn list_containers(&self) -> Result<Vec<Container>>;

    /// List non-intermediate images
    async fn list_images(&self) -> Result<Vec<Image>>;

    /// Remove an image by full identifier
    async fn remove_image(&self, id: &str, force: bool) -> Result<()>;

    /// Remove a container by full identifier
    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<()>;

    /// Forward daemon events that occurred at or after `since` into `sink`,
    /// until the stream ends or the receiver is dropped
    async fn stream_events(
        &self,
        since: SystemTime,
        sink: mpsc::Sender<DaemonEvent>,
    ) -> Result<()>;
}
