//! Normalization of stored profile image paths.
//!
//! Photo paths reach us in several shapes depending on when and how they were
//! uploaded: bare file names, paths under the public `storage/` mount, or
//! paths still carrying the server-side disk prefix `storage/app/public/`.
//! They all name the same file on the file-serving host, so they must
//! collapse to one URL.

/// Server-side disk prefix that older uploads carry.
pub const LEGACY_PREFIX: &str = "storage/app/public/";

/// Public mount segment on the file-serving host.
const STORAGE_SEGMENT: &str = "storage";

/// Resolves raw photo paths into canonical absolute URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarResolver {
    base_url: String,
    default_avatar: String,
}

impl AvatarResolver {
    /// Creates a resolver for the file-serving host at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, default_avatar: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_avatar: default_avatar.into(),
        }
    }

    /// Returns the asset used when no photo is known.
    #[must_use]
    pub fn default_avatar(&self) -> &str {
        &self.default_avatar
    }

    /// Resolves a raw stored path.
    #[must_use]
    pub fn resolve(&self, raw: Option<&str>) -> String {
        let path = raw.map(|r| r.trim().trim_start_matches('/')).unwrap_or_default();
        if path.is_empty() {
            return self.default_avatar.clone();
        }

        let mut path = path;
        while let Some(rest) = path.strip_prefix(LEGACY_PREFIX) {
            path = rest.trim_start_matches('/');
        }
        if path.is_empty() {
            return self.default_avatar.clone();
        }

        if path == STORAGE_SEGMENT || path.starts_with("storage/") {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}/{}", self.base_url, STORAGE_SEGMENT, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: &str = "/images/default-avatar.png";

    fn resolver() -> AvatarResolver {
        AvatarResolver::new("http://files.example.com/", DEFAULT)
    }

    #[test]
    fn missing_or_empty_yields_default() {
        let r = resolver();
        assert_eq!(r.resolve(None), DEFAULT);
        assert_eq!(r.resolve(Some("")), DEFAULT);
        assert_eq!(r.resolve(Some("   ")), DEFAULT);
        assert_eq!(r.resolve(None), r.resolve(Some("")));
    }

    #[test]
    fn bare_name_gets_storage_segment() {
        assert_eq!(
            resolver().resolve(Some("x.jpg")),
            "http://files.example.com/storage/x.jpg"
        );
    }

    #[test]
    fn storage_path_only_gets_base() {
        assert_eq!(
            resolver().resolve(Some("storage/staff/x.jpg")),
            "http://files.example.com/storage/staff/x.jpg"
        );
    }

    #[test]
    fn legacy_prefix_is_equivalent_to_bare_name() {
        let r = resolver();
        assert_eq!(r.resolve(Some("storage/app/public/x.jpg")), r.resolve(Some("x.jpg")));
        assert_eq!(
            r.resolve(Some("/storage/app/public/staff/x.jpg")),
            r.resolve(Some("staff/x.jpg"))
        );
    }

    #[test]
    fn output_never_contains_legacy_prefix() {
        let r = resolver();
        for raw in [
            "storage/app/public/x.jpg",
            "/storage/app/public/x.jpg",
            "storage/app/public//x.jpg",
            "storage/app/public/storage/app/public/x.jpg",
            "x.jpg",
            "storage/x.jpg",
        ] {
            assert!(!r.resolve(Some(raw)).contains(LEGACY_PREFIX), "{raw}");
        }
    }

    #[test]
    fn leading_slash_is_insignificant() {
        let r = resolver();
        assert_eq!(r.resolve(Some("/storage/x.jpg")), r.resolve(Some("storage/x.jpg")));
        assert_eq!(r.resolve(Some("/x.jpg")), r.resolve(Some("x.jpg")));
    }

    #[test]
    fn storage_prefixed_file_name_is_not_a_segment() {
        assert_eq!(
            resolver().resolve(Some("storage_room.jpg")),
            "http://files.example.com/storage/storage_room.jpg"
        );
    }
}
