use crate::domain::{DaemonEvent, DaemonGateway};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long the logger keeps listening after shutdown once events stop arriving.
pub const DRAIN_IDLE: Duration = Duration::from_millis(250);

/// Upper bound on the time spent draining after shutdown, however busy the daemon is.
pub const MAX_DRAIN: Duration = Duration::from_secs(1);

const EVENT_BUFFER: usize = 64;

/// Background task printing the daemon event stream.
///
/// The subscription asks for events since the moment the logger was spawned,
/// so events caused by work started right after spawning are not lost while
/// the request is still in flight. Stopped explicitly with
/// [`EventLogger::shutdown`].
pub struct EventLogger {
    shutdown: CancellationToken,
    handle: JoinHandle<usize>,
}

impl EventLogger {
    pub fn spawn(gateway: Arc<dyn DaemonGateway>) -> Self {
        Self::spawn_with_limits(gateway, DRAIN_IDLE, MAX_DRAIN)
    }

    pub fn spawn_with_limits(
        gateway: Arc<dyn DaemonGateway>,
        idle: Duration,
        max_drain: Duration,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let since = SystemTime::now();

        let handle = tokio::spawn(async move {
            let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
            let mut listener = gateway.stream_events(since, tx);
            let mut listening = true;
            let mut logged = 0;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    result = &mut listener, if listening => {
                        listening = false;
                        report_listener_end(result);
                    }
                    Some(event) = rx.recv() => {
                        log_event(&event);
                        logged += 1;
                    }
                }
            }

            // Keep reading until the stream goes quiet or the deadline passes.
            let deadline = tokio::time::sleep(max_drain);
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    result = &mut listener, if listening => {
                        listening = false;
                        report_listener_end(result);
                    }
                    received = tokio::time::timeout(idle, rx.recv()) => match received {
                        Ok(Some(event)) => {
                            log_event(&event);
                            logged += 1;
                        }
                        _ => break,
                    }
                }
            }

            // Ends the subscription and closes the channel.
            drop(listener);
            while let Ok(event) = rx.try_recv() {
                log_event(&event);
                logged += 1;
            }

            logged
        });

        Self { shutdown, handle }
    }

    /// Cancels the listener, logs the events still in flight within the drain
    /// limits and returns how many events were logged in total.
    pub async fn shutdown(self) -> usize {
        self.shutdown.cancel();
        match self.handle.await {
            Ok(logged) => logged,
            Err(e) => {
                warn!("event logger task ended abnormally: {e}");
                0
            }
        }
    }
}

fn log_event(event: &DaemonEvent) {
    info!("daemon: {} {} {}", event.origin, event.status, event.id);
}

fn report_listener_end(result: Result<()>) {
    if let Err(e) = result {
        warn!("daemon event stream closed: {e:#}");
    }
}
