pub mod config;
pub mod docker_adapter;
pub mod logging;

pub use config::Settings;
pub use docker_adapter::DockerAdapter;
