use crate::domain::{Container, DaemonEvent, DaemonGateway, DaemonVersion, Image};
use anyhow::{Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;

/// In-memory daemon recording every call it receives.
///
/// Removals append `delete`/`destroy` events stamped with the current time,
/// and the event stream only delivers timestamped events at or after the
/// requested `since`, like the daemon's event log.
///
/// Failures are injected with [`MockDaemon::set_fail_on`], either for a whole
/// operation (`"list_images"`) or for one item (`"remove_image:<id>"`).
#[derive(Debug, Default)]
pub struct MockDaemon {
    images: RwLock<Vec<Image>>,
    containers: RwLock<Vec<Container>>,
    events: RwLock<Vec<(Option<SystemTime>, DaemonEvent)>>,
    events_open: RwLock<bool>,
    event_interval: RwLock<Option<Duration>>,
    subscribe_delay: RwLock<Option<Duration>>,
    commands: RwLock<Vec<String>>,
    fail_on: RwLock<HashSet<String>>,
}

impl MockDaemon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&self, image: Image) {
        self.images.write().unwrap().push(image);
    }

    pub fn add_container(&self, container: Container) {
        self.containers.write().unwrap().push(container);
    }

    /// Queue an event delivered to every subscriber, whatever its `since`.
    pub fn add_event(&self, event: DaemonEvent) {
        self.events.write().unwrap().push((None, event));
    }

    pub fn add_event_at(&self, at: SystemTime, event: DaemonEvent) {
        self.events.write().unwrap().push((Some(at), event));
    }

    /// After the queued events, keep emitting an `exec_start` event at this interval.
    pub fn emit_every(&self, interval: Duration) {
        *self.event_interval.write().unwrap() = Some(interval);
    }

    /// Delay before the subscription starts reading the event log.
    pub fn set_subscribe_delay(&self, delay: Duration) {
        *self.subscribe_delay.write().unwrap() = Some(delay);
    }

    /// Keep the event stream pending after the queued events, like a live daemon.
    pub fn keep_events_open(&self, open: bool) {
        *self.events_open.write().unwrap() = open;
    }

    pub fn set_fail_on(&self, operation: &str) {
        self.fail_on.write().unwrap().insert(operation.to_string());
    }

    pub fn get_commands(&self) -> Vec<String> {
        self.commands.read().unwrap().clone()
    }

    /// Recorded `remove_*` calls, in order.
    pub fn removals(&self) -> Vec<String> {
        self.get_commands()
            .into_iter()
            .filter(|cmd| cmd.starts_with("remove_"))
            .collect()
    }

    pub fn image_exists(&self, id: &str) -> bool {
        self.images.read().unwrap().iter().any(|i| i.id == id)
    }

    pub fn container_exists(&self, id: &str) -> bool {
        self.containers.read().unwrap().iter().any(|c| c.id == id)
    }

    fn record_command(&self, cmd: &str) {
        self.commands.write().unwrap().push(cmd.to_string());
    }

    fn check_fail(&self, operation: &str) -> Result<()> {
        if self.fail_on.read().unwrap().contains(operation) {
            bail!("Mock failure on: {}", operation);
        }
        Ok(())
    }
}

#[async_trait]
impl DaemonGateway for MockDaemon {
    async fn version(&self) -> Result<DaemonVersion> {
        self.record_command("version");
        self.check_fail("version")?;

        Ok(DaemonVersion {
            version: Some("mock".into()),
            api_version: Some("1.45".into()),
            ..Default::default()
        })
    }

    async fn list_containers(&self) -> Result<Vec<Container>> {
        self.record_command("list_containers");
        self.check_fail("list_containers")?;
        Ok(self.containers.read().unwrap().clone())
    }

    async fn list_images(&self) -> Result<Vec<Image>> {
        self.record_command("list_images");
        self.check_fail("list_images")?;
        Ok(self.images.read().unwrap().clone())
    }

    async fn remove_image(&self, id: &str, force: bool) -> Result<()> {
        self.record_command(&format!("remove_image:{id}:force={force}"));
        self.check_fail(&format!("remove_image:{id}"))?;

        self.images.write().unwrap().retain(|i| i.id != id);
        self.add_event_at(SystemTime::now(), mock_event("delete", id));
        Ok(())
    }

    async fn remove_container(&self, id: &str, remove_volumes: bool) -> Result<()> {
        self.record_command(&format!("remove_container:{id}:volumes={remove_volumes}"));
        self.check_fail(&format!("remove_container:{id}"))?;

        self.containers.write().unwrap().retain(|c| c.id != id);
        self.add_event_at(SystemTime::now(), mock_event("destroy", id));
        Ok(())
    }

    async fn stream_events(
        &self,
        since: SystemTime,
        sink: mpsc::Sender<DaemonEvent>,
    ) -> Result<()> {
        self.record_command("stream_events");
        self.check_fail("stream_events")?;

        let delay = *self.subscribe_delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let events: Vec<DaemonEvent> = self
            .events
            .read()
            .unwrap()
            .iter()
            .filter(|(at, _)| match at {
                Some(at) => *at >= since,
                None => true,
            })
            .map(|(_, event)| event.clone())
            .collect();
        for event in events {
            if sink.send(event).await.is_err() {
                return Ok(());
            }
        }

        let interval = *self.event_interval.read().unwrap();
        if let Some(interval) = interval {
            loop {
                tokio::time::sleep(interval).await;
                if sink.send(mock_event("exec_start", "mock")).await.is_err() {
                    return Ok(());
                }
            }
        }

        let open = *self.events_open.read().unwrap();
        if open {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

fn mock_event(status: &str, id: &str) -> DaemonEvent {
    DaemonEvent {
        origin: "mock".into(),
        status: status.into(),
        id: id.to_string(),
    }
}
