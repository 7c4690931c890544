mod cleanup_service;
mod event_logger;

pub use cleanup_service::{CleanupReport, CleanupService, RemovalFailure};
pub use event_logger::{DRAIN_IDLE, EventLogger};
