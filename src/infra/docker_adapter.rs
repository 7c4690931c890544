use super::config::{CLIENT_TIMEOUT_SECS, Endpoint};
use crate::domain::{
    CleanupError, Container, DaemonEvent, DaemonGateway, DaemonVersion, Image,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bollard::models::EventMessage;
use bollard::query_parameters::{
    EventsOptions, ListContainersOptionsBuilder, ListImagesOptionsBuilder,
    RemoveContainerOptionsBuilder, RemoveImageOptionsBuilder,
};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures::StreamExt;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::debug;

/// [`DaemonGateway`] backed by the Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerAdapter {
    docker: Docker,
    endpoint: String,
}

impl DockerAdapter {
    /// Builds a client for `endpoint`. No request is sent yet; call
    /// [`DaemonGateway::version`] to check the daemon is reachable.
    pub fn connect(endpoint: &str) -> Result<Self, CleanupError> {
        debug!("Connecting to Docker daemon via: {endpoint}");

        let docker = match Endpoint::parse(endpoint)? {
            Endpoint::Unix(path) => {
                Docker::connect_with_unix(&path, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
            Endpoint::Http(addr) => {
                Docker::connect_with_http(&addr, CLIENT_TIMEOUT_SECS, API_DEFAULT_VERSION)
            }
        }
        .map_err(|e| CleanupError::Connection {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            docker,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DaemonGateway for DockerAdapter {
    async fn version(&self) -> Result<DaemonVersion> {
        let version = self.docker.version().await.map_err(|e| CleanupError::Connection {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        Ok(DaemonVersion {
            version: version.version,
            api_version: version.api_version,
            min_api_version: version.min_api_version,
            os: version.os,
            arch: version.arch,
            kernel_version: version.kernel_version,
            go_version: version.go_version,
            git_commit: version.git_commit,
        })
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        let options = ListContainersOptionsBuilder::new().all(true).build();
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .context("listing containers (all=true)")?;

        Ok(summaries
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                Some(Container::new(
                    id,
                    summary.names.unwrap_or_default(),
                    summary.image.unwrap_or_default(),
                ))
            })
            .collect())
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        let options = ListImagesOptionsBuilder::new().all(false).build();
        let summaries = self
            .docker
            .list_images(Some(options))
            .await
            .context("listing images (all=false)")?;

        Ok(summaries
            .into_iter()
            .map(|summary| Image::new(summary.id, summary.repo_tags))
            .collect())
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<()> {
        let options = RemoveImageOptionsBuilder::new().force(force).build();
        self.docker
            .remove_image(id, Some(options), None)
            .await
            .with_context(|| format!("removing image {id}"))?;
        Ok(())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<()> {
        let options = RemoveContainerOptionsBuilder::new()
            .v(remove_volumes)
            .build();
        self.docker
            .remove_container(id, Some(options))
            .await
            .with_context(|| format!("removing container {id}"))
    }

    async fn stream_events(
        &self,
        since: SystemTime,
        sink: mpsc::Sender<DaemonEvent>,
    ) -> Result<()> {
        let options = events_since(since);
        let mut stream = Box::pin(self.docker.events(Some(options)));

        while let Some(message) = stream.next().await {
            let message = message.context("reading daemon event stream")?;
            if sink.send(event_from_message(message)).await.is_err() {
                break;
            }
        }

        Ok(())
    }
}

/// The daemon filters on whole seconds, so events from the start of that
/// second are replayed as well.
fn events_since(since: SystemTime) -> EventsOptions {
    let secs = since
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    EventsOptions {
        since: Some(secs.to_string()),
        ..Default::default()
    }
}

fn event_from_message(message: EventMessage) -> DaemonEvent {
    let actor = message.actor.unwrap_or_default();
    let origin = actor
        .attributes
        .as_ref()
        .and_then(|attrs| attrs.get("image").cloned())
        .or_else(|| message.typ.map(|typ| typ.to_string()))
        .unwrap_or_default();

    DaemonEvent {
        origin,
        status: message.action.unwrap_or_default(),
        id: actor.id.unwrap_or_default(),
    }
}
