use crate::domain::policy::{is_orphaned_container, is_orphaned_image};
use crate::domain::{ContainerIndex, DaemonGateway, ImageIndex};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Items the policy selected for removal
    pub candidates: usize,
    pub removed: usize,
    pub failures: Vec<RemovalFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalFailure {
    pub id: String,
    pub reason: String,
}

impl CleanupReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn record(&mut self, short_id: &str, result: Result<()>) {
        match result {
            Ok(()) => {
                debug!("{short_id} removed");
                self.removed += 1;
            }
            Err(e) => {
                error!("  Failed to remove {short_id}: {e:#}");
                self.failures.push(RemovalFailure {
                    id: short_id.to_string(),
                    reason: format!("{e:#}"),
                });
            }
        }
    }
}

/// Drives fetch → filter → delete against the daemon.
///
/// The indices are owned by the caller and refilled on every fetch; each
/// candidate is removed independently and a failure never stops the batch.
pub struct CleanupService {
    gateway: Arc<dyn DaemonGateway>,
    debug: bool,
}

impl CleanupService {
    pub fn new(gateway: Arc<dyn DaemonGateway>, debug: bool) -> Self {
        Self { gateway, debug }
    }

    /// Replaces the contents of `index` with every container known to the daemon.
    pub async fn fetch_containers(&self, index: &mut ContainerIndex) -> Result<()> {
        let containers = self
            .gateway
            .list_containers()
            .await
            .context("client.list_containers(all=true)")?;

        index.clear();
        for container in containers {
            let id = container.id.clone();
            if let Err(e) = index.add(container) {
                warn!("Skipping container {id}: {e}");
            }
        }

        if self.debug {
            index.dump().context("printing index dump")?;
        }
        Ok(())
    }

    /// Replaces the contents of `index` with the daemon's non-intermediate images.
    pub async fn fetch_images(&self, index: &mut ImageIndex) -> Result<()> {
        let images = self
            .gateway
            .list_images()
            .await
            .context("client.list_images(all=false)")?;

        index.clear();
        for image in images {
            let id = image.id.clone();
            if let Err(e) = index.add(image) {
                warn!("Skipping image {id}: {e}");
            }
        }

        if self.debug {
            index.dump().context("printing index dump")?;
        }
        Ok(())
    }

    /// Removes every image whose only tag is `<none>:<none>`.
    pub async fn cleanup_images(&self, images: &mut ImageIndex, force: bool) -> Result<CleanupReport> {
        self.fetch_images(images).await?;

        let mut report = CleanupReport::default();
        for image in images.iter().filter(|image| is_orphaned_image(image)) {
            report.candidates += 1;
            info!("removing image {}", image.short_id());

            let result = self.gateway.remove_image(&image.id, force).await;
            report.record(image.short_id(), result);
        }

        Ok(report)
    }

    /// Removes, with their volumes, containers whose image reference no longer
    /// resolves to a tagged image.
    pub async fn cleanup_containers(
        &self,
        containers: &mut ContainerIndex,
        images: &mut ImageIndex,
    ) -> Result<CleanupReport> {
        self.fetch_containers(containers).await?;
        self.fetch_images(images).await?;
        let images: &ImageIndex = images;

        let mut report = CleanupReport::default();
        for container in containers
            .iter()
            .filter(|container| is_orphaned_container(container, images))
        {
            report.candidates += 1;
            info!(
                "removing container {} based on image {}",
                container.short_id(),
                container.image
            );

            let result = self.gateway.remove_container(&container.id, true).await;
            report.record(container.short_id(), result);
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Container, Image, NONE_REPO_TAG};
    use crate::test_support::MockDaemon;

    const UNTAGGED_ID: &str = "sha256:abc123456789aaaaaaaaaaaaaaaa";
    const TAGGED_ID: &str = "sha256:def123456789bbbbbbbbbbbbbbbb";

    fn service(mock: &Arc<MockDaemon>) -> CleanupService {
        CleanupService::new(mock.clone(), false)
    }

    #[tokio::test]
    async fn test_fetch_images_skips_invalid_identifiers() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new("short", vec!["a:1".into()]));
        mock.add_image(Image::new(TAGGED_ID, vec!["app:latest".into()]));

        let mut images = ImageIndex::new();
        service(&mock).fetch_images(&mut images).await.unwrap();

        assert_eq!(images.len(), 1);
        assert!(images.find_by_secondary_key("app:latest").is_some());
        assert!(images.find_by_secondary_key("a:1").is_none());
    }

    #[tokio::test]
    async fn test_fetch_with_debug_prints_dump() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new(TAGGED_ID, vec!["app:latest".into()]));

        let mut images = ImageIndex::new();
        CleanupService::new(mock.clone(), true)
            .fetch_images(&mut images)
            .await
            .unwrap();

        assert_eq!(images.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_replaces_previous_contents() {
        let mock = Arc::new(MockDaemon::new());
        let mut images = ImageIndex::new();
        images
            .add(Image::new("stale0000000000000", vec!["old:1".into()]))
            .unwrap();
        mock.add_image(Image::new(TAGGED_ID, vec!["app:latest".into()]));

        service(&mock).fetch_images(&mut images).await.unwrap();

        assert_eq!(images.len(), 1);
        assert!(images.find_by_secondary_key("old:1").is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_propagated() {
        let mock = Arc::new(MockDaemon::new());
        mock.set_fail_on("list_containers");

        let mut containers = ContainerIndex::new();
        let err = service(&mock)
            .fetch_containers(&mut containers)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("list_containers"));
    }

    #[tokio::test]
    async fn test_cleanup_images_only_removes_untagged() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new(UNTAGGED_ID, vec![NONE_REPO_TAG.into()]));
        mock.add_image(Image::new(TAGGED_ID, vec!["app:latest".into()]));

        let mut images = ImageIndex::new();
        let report = service(&mock)
            .cleanup_images(&mut images, false)
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(
            mock.removals(),
            vec![format!("remove_image:{UNTAGGED_ID}:force=false")]
        );
    }

    #[tokio::test]
    async fn test_cleanup_images_passes_force() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new(UNTAGGED_ID, vec![NONE_REPO_TAG.into()]));

        let mut images = ImageIndex::new();
        service(&mock)
            .cleanup_images(&mut images, true)
            .await
            .unwrap();

        assert_eq!(
            mock.removals(),
            vec![format!("remove_image:{UNTAGGED_ID}:force=true")]
        );
    }

    #[tokio::test]
    async fn test_cleanup_containers_keeps_containers_on_tagged_images() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new(TAGGED_ID, vec!["app:latest".into()]));
        mock.add_container(Container::new(
            "c0ffee1234567890",
            vec!["/web".into()],
            "app:latest",
        ));

        let mut containers = ContainerIndex::new();
        let mut images = ImageIndex::new();
        let report = service(&mock)
            .cleanup_containers(&mut containers, &mut images)
            .await
            .unwrap();

        assert_eq!(report, CleanupReport::default());
        assert!(mock.removals().is_empty());
    }

    #[tokio::test]
    async fn test_failed_removal_is_recorded() {
        let mock = Arc::new(MockDaemon::new());
        mock.add_image(Image::new(UNTAGGED_ID, vec![NONE_REPO_TAG.into()]));
        mock.set_fail_on(&format!("remove_image:{UNTAGGED_ID}"));

        let mut images = ImageIndex::new();
        let report = service(&mock)
            .cleanup_images(&mut images, false)
            .await
            .unwrap();

        assert_eq!(report.candidates, 1);
        assert_eq!(report.removed, 0);
        assert!(report.has_failures());
        assert_eq!(report.failures[0].id, "abc123456789");
    }
}
