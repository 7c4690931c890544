//! Removal rules for images and containers.

use super::entity::{Container, Image, is_none_repo_tag};
use super::index::ImageIndex;

/// An image is orphaned when its only repository:tag is `<none>:<none>`.
///
/// Images with no tags at all, or with several, never match.
pub fn is_orphaned_image(image: &Image) -> bool {
    matches!(image.repo_tags.as_slice(), [only] if is_none_repo_tag(only))
}

/// A container is orphaned when its image reference does not resolve to any
/// tagged image in `images`.
pub fn is_orphaned_container(container: &Container, images: &ImageIndex) -> bool {
    images.find_by_secondary_key(&container.image).is_none()
}
