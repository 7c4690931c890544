use super::errors::CleanupError;

/// Repository:tag the daemon reports for an image without any tag.
pub const NONE_REPO_TAG: &str = "<none>:<none>";

/// Length of the short identifier used as primary index key and in logs.
pub const SHORT_ID_LEN: usize = 12;

const DIGEST_PREFIX: &str = "sha256:";

/// Returns the 12 character short form of a daemon identifier.
///
/// Image identifiers come back as `sha256:<hex>`; the algorithm prefix is
/// dropped before truncating, the same way `docker images` displays them.
pub fn short_id(id: &str) -> Result<&str, CleanupError> {
    let hex = id.strip_prefix(DIGEST_PREFIX).unwrap_or(id);
    hex.get(..SHORT_ID_LEN)
        .ok_or_else(|| CleanupError::InvalidIdentifier(id.to_string()))
}

/// Something that can be stored in an [`EntityIndex`](super::EntityIndex).
pub trait Indexed {
    /// Full daemon identifier.
    fn id(&self) -> &str;

    /// Human readable lookup keys (repository:tag, container name).
    fn secondary_keys(&self) -> impl Iterator<Item = &str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: String,
    pub repo_tags: Vec<String>,
}

impl Image {
    pub fn new(id: impl Into<String>, repo_tags: Vec<String>) -> Self {
        Self {
            id: id.into(),
            repo_tags,
        }
    }

    /// Short identifier for log output; falls back to the full id when it is too short.
    pub fn short_id(&self) -> &str {
        short_id(&self.id).unwrap_or(&self.id)
    }
}

impl Indexed for Image {
    fn id(&self) -> &str {
        &self.id
    }

    fn secondary_keys(&self) -> impl Iterator<Item = &str> {
        self.repo_tags
            .iter()
            .map(String::as_str)
            .filter(|tag| !is_none_repo_tag(tag))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub names: Vec<String>,
    /// Image reference the container was created from, as given by the user
    /// (repository:tag), not the image identifier.
    pub image: String,
}

impl Container {
    pub fn new(id: impl Into<String>, names: Vec<String>, image: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            names,
            image: image.into(),
        }
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id).unwrap_or(&self.id)
    }
}

impl Indexed for Container {
    fn id(&self) -> &str {
        &self.id
    }

    fn secondary_keys(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Daemon version/info as reported by the version endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaemonVersion {
    pub version: Option<String>,
    pub api_version: Option<String>,
    pub min_api_version: Option<String>,
    pub os: Option<String>,
    pub arch: Option<String>,
    pub kernel_version: Option<String>,
    pub go_version: Option<String>,
    pub git_commit: Option<String>,
}

impl DaemonVersion {
    /// Key/value pairs for the debug banner, skipping fields the daemon left out.
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("Version", &self.version),
            ("ApiVersion", &self.api_version),
            ("MinAPIVersion", &self.min_api_version),
            ("Os", &self.os),
            ("Arch", &self.arch),
            ("KernelVersion", &self.kernel_version),
            ("GoVersion", &self.go_version),
            ("GitCommit", &self.git_commit),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
        .collect()
    }
}

/// One entry of the daemon event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEvent {
    /// Image the event concerns, or the object type when the daemon gives none.
    pub origin: String,
    pub status: String,
    pub id: String,
}

pub fn is_none_repo_tag(tag: &str) -> bool {
    tag == NONE_REPO_TAG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_id_truncates_to_twelve() {
        assert_eq!(short_id("abc123456789def0").unwrap(), "abc123456789");
    }

    #[test]
    fn test_short_id_strips_digest_prefix() {
        assert_eq!(
            short_id("sha256:0123456789abcdef0123").unwrap(),
            "0123456789ab"
        );
    }

    #[test]
    fn test_short_id_rejects_short_identifier() {
        let err = short_id("abc").unwrap_err();
        assert!(matches!(err, CleanupError::InvalidIdentifier(id) if id == "abc"));
        assert!(short_id("sha256:abc").is_err());
    }

    #[test]
    fn test_image_secondary_keys_skip_none_tag() {
        let image = Image::new(
            "abc123456789ffff",
            vec!["app:1".into(), NONE_REPO_TAG.into(), "app:latest".into()],
        );
        let keys: Vec<&str> = image.secondary_keys().collect();
        assert_eq!(keys, vec!["app:1", "app:latest"]);
    }

    #[test]
    fn test_container_secondary_keys_are_names() {
        let container = Container::new("c1c1c1c1c1c1c1", vec!["/web".into(), "/web-alias".into()], "app:1");
        let keys: Vec<&str> = container.secondary_keys().collect();
        assert_eq!(keys, vec!["/web", "/web-alias"]);
    }

    #[test]
    fn test_short_id_display_falls_back_to_full_id() {
        let container = Container::new("c1", vec![], "app:1");
        assert_eq!(container.short_id(), "c1");
    }

    #[test]
    fn test_version_entries_skip_missing_fields() {
        let version = DaemonVersion {
            version: Some("27.0.1".into()),
            os: Some("linux".into()),
            ..Default::default()
        };
        assert_eq!(version.entries(), vec![("Version", "27.0.1"), ("Os", "linux")]);
    }
}
