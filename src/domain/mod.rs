mod entity;
pub mod errors;
mod index;
pub mod policy;
pub mod traits;

pub use entity::{
    Container, DaemonEvent, DaemonVersion, Image, Indexed, NONE_REPO_TAG, SHORT_ID_LEN, short_id,
};
pub use errors::CleanupError;
pub use index::{ContainerIndex, EntityIndex, ImageIndex};
pub use traits::DaemonGateway;
