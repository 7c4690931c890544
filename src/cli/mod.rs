use crate::domain::{ContainerIndex, DaemonGateway, DaemonVersion, ImageIndex};
use crate::infra::config::DOCKER_HOST_ENV;
use crate::infra::{DockerAdapter, Settings};
use crate::services::{CleanupReport, CleanupService, EventLogger};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};

/// Exit status used by `--strict` when some removals failed.
pub const PARTIAL_FAILURE_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "dockclean",
    version,
    about = "Removes untagged Docker images and the containers built from them"
)]
pub struct Cli {
    /// Show extra info (daemon banner, index dumps)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Exit with status 2 when any image or container could not be removed
    #[arg(long, global = true)]
    pub strict: bool,

    /// Docker daemon endpoint (default: unix:///var/run/docker.sock)
    #[arg(long = "host", env = DOCKER_HOST_ENV, global = true)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Cleanup any untagged images
    CleanupImages {
        /// Force removal of images still referenced by stopped containers
        #[arg(long)]
        force: bool,
    },
    /// Cleanup any containers based on untagged images
    CleanupContainers,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings::new(self.host.as_deref(), self.debug, self.strict)
    }
}

/// Connects to the daemon named by `cli` and runs the selected cleanup.
pub async fn run(cli: Cli) -> Result<u8> {
    let settings = cli.settings();
    let adapter = DockerAdapter::connect(&settings.endpoint)?;

    execute(Arc::new(adapter), &settings, &cli.command).await
}

/// Runs one cleanup command against `gateway` and returns the process exit status.
///
/// The event logger runs for the duration of the command and is drained
/// before returning, whether the command succeeded or not.
pub async fn execute(
    gateway: Arc<dyn DaemonGateway>,
    settings: &Settings,
    command: &Commands,
) -> Result<u8> {
    let version = gateway
        .version()
        .await
        .context("Could not connect to Docker daemon")?;
    if settings.debug {
        show_daemon_version(&version);
    }

    let events = EventLogger::spawn(gateway.clone());
    let service = CleanupService::new(gateway, settings.debug);
    let mut images = ImageIndex::new();
    let mut containers = ContainerIndex::new();

    let outcome = match command {
        Commands::CleanupImages { force } => service.cleanup_images(&mut images, *force).await,
        Commands::CleanupContainers => {
            service
                .cleanup_containers(&mut containers, &mut images)
                .await
        }
    };

    events.shutdown().await;

    let report = outcome?;
    summarize(&report);
    Ok(exit_status(&report, settings.strict))
}

pub fn exit_status(report: &CleanupReport, strict: bool) -> u8 {
    if strict && report.has_failures() {
        PARTIAL_FAILURE_EXIT
    } else {
        0
    }
}

fn summarize(report: &CleanupReport) {
    if report.has_failures() {
        warn!(
            "Removed {} of {} candidates, {} failed",
            report.removed,
            report.candidates,
            report.failures.len()
        );
    } else {
        info!(
            "Removed {} of {} candidates",
            report.removed, report.candidates
        );
    }
}

fn show_daemon_version(version: &DaemonVersion) {
    println!("Docker daemon info:");
    for (key, value) in version.entries() {
        println!("  {key:<15} : {value}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RemovalFailure;

    #[test]
    fn test_parse_cleanup_images() {
        let cli = Cli::try_parse_from(["dockclean", "cleanup-images"]).unwrap();
        assert_eq!(cli.command, Commands::CleanupImages { force: false });
        assert!(!cli.debug);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dockclean",
            "cleanup-containers",
            "--debug",
            "--strict",
            "--host",
            "tcp://127.0.0.1:2375",
        ])
        .unwrap();

        assert_eq!(cli.command, Commands::CleanupContainers);
        assert!(cli.debug);
        assert!(cli.strict);
        assert_eq!(cli.settings().endpoint, "tcp://127.0.0.1:2375");
    }

    #[test]
    fn test_parse_force_flag() {
        let cli = Cli::try_parse_from(["dockclean", "cleanup-images", "--force"]).unwrap();
        assert_eq!(cli.command, Commands::CleanupImages { force: true });
    }

    #[test]
    fn test_missing_or_unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["dockclean"]).is_err());
        assert!(Cli::try_parse_from(["dockclean", "cleanup-volumes"]).is_err());
    }

    #[test]
    fn test_exit_status() {
        let clean = CleanupReport {
            candidates: 2,
            removed: 2,
            failures: vec![],
        };
        let partial = CleanupReport {
            candidates: 2,
            removed: 1,
            failures: vec![RemovalFailure {
                id: "abc123456789".into(),
                reason: "conflict".into(),
            }],
        };

        assert_eq!(exit_status(&clean, true), 0);
        assert_eq!(exit_status(&partial, false), 0);
        assert_eq!(exit_status(&partial, true), PARTIAL_FAILURE_EXIT);
    }
}
