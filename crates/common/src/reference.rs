//! Canonical plugin identifiers
//!
//! Plugins are referenced in several shapes:
//!
//! ```text
//! oci://quay.io/org/tech-radar@sha256:abc!backstage-plugin-tech-radar
//! oci://quay.io/org/tech-radar:1.2.0
//! ./dynamic-plugins/dist/backstage-plugin-tech-radar-dynamic
//! @backstage-community/plugin-tech-radar@1.0.0
//! ```
//!
//! All of them reduce to the last path segment with any tag or digest
//! removed. The `!alias` suffix of OCI references is never the identifier.

/// Characters that start a tag or digest suffix in the last path segment
const SUFFIX_DELIMITERS: [char; 2] = [':', '@'];

/// Return the short plugin name used to match a package reference against metadata.
///
/// Total: any input produces a string. References without a `/` (after the
/// alias is removed) and references whose last segment is empty come back
/// unchanged.
pub fn extract_plugin_name(reference: &str) -> String {
    let without_alias = match reference.find('!') {
        Some(idx) => &reference[..idx],
        None => reference,
    };

    let Some(slash) = without_alias.rfind('/') else {
        return reference.to_string();
    };

    let segment = &without_alias[slash + 1..];
    let name = segment.split(SUFFIX_DELIMITERS).next().unwrap_or_default();

    if name.is_empty() {
        reference.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("oci://quay.io/rhdh/plugin@sha256:abc!my-alias", "plugin"; "oci digest with alias")]
    #[test_case("oci://ghcr.io/org/tech-radar:1.2.0!backstage-plugin-tech-radar", "tech-radar"; "oci tag with alias")]
    #[test_case("oci://ghcr.io/org/tech-radar:1.2.0", "tech-radar"; "oci tag")]
    #[test_case("oci://localhost:5000/notifications", "notifications"; "registry with port")]
    #[test_case("./dynamic-plugins/dist/backstage-plugin-tech-radar-dynamic", "backstage-plugin-tech-radar-dynamic"; "local path")]
    #[test_case("@backstage-community/plugin-tech-radar@1.0.0", "plugin-tech-radar"; "scoped npm package")]
    fn test_extract_plugin_name(reference: &str, expected: &str) {
        assert_eq!(extract_plugin_name(reference), expected);
    }

    #[test_case("tech-radar"; "bare name")]
    #[test_case("tech-radar@1.0.0"; "bare name with version")]
    #[test_case("plugin!alias"; "bare name with alias")]
    #[test_case(""; "empty")]
    fn test_without_slash_is_unchanged(reference: &str) {
        assert_eq!(extract_plugin_name(reference), reference);
    }

    #[test]
    fn test_trailing_slash_falls_back_to_reference() {
        assert_eq!(extract_plugin_name("oci://quay.io/org/"), "oci://quay.io/org/");
        assert_eq!(extract_plugin_name("oci://quay.io/org/:latest"), "oci://quay.io/org/:latest");
    }

    #[test]
    fn test_alias_slashes_are_ignored() {
        assert_eq!(
            extract_plugin_name("oci://quay.io/org/events@sha256:00ff!vendor/events-backend"),
            "events"
        );
    }
}
