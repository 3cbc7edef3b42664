//! Plugin metadata descriptors
//!
//! Each plugin ships a descriptor shaped like a custom resource:
//!
//! ```yaml
//! apiVersion: extensions.backstage.io/v1alpha1
//! kind: Package
//! spec:
//!   packageName: "@backstage-community/plugin-tech-radar"
//!   dynamicArtifact: oci://quay.io/org/tech-radar:1.2.0!backstage-community-plugin-tech-radar
//!   appConfigExamples:
//!     - title: Default configuration
//!       content:
//!         techRadar:
//!           url: https://example.com/radar.json
//! ```
//!
//! Scanning a directory of descriptors yields a [`MetadataIndex`] keyed by
//! the canonical plugin name of each `dynamicArtifact`.

use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::reference::extract_plugin_name;

#[derive(Debug, Deserialize)]
struct Descriptor {
    #[serde(default)]
    spec: Option<DescriptorSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescriptorSpec {
    #[serde(default)]
    package_name: Option<String>,

    #[serde(default)]
    dynamic_artifact: Option<String>,

    #[serde(default)]
    app_config_examples: Vec<ConfigExample>,
}

#[derive(Debug, Deserialize)]
struct ConfigExample {
    #[serde(default)]
    content: Option<Value>,
}

/// Metadata extracted from one descriptor file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// Package reference to deploy (`spec.dynamicArtifact`)
    pub artifact_path: String,

    /// Default plugin configuration (`content` of the first config example)
    pub config: Mapping,

    /// `spec.packageName`, empty when absent
    pub name: String,

    /// Descriptor this record was read from
    pub source_file: PathBuf,
}

impl PluginMetadata {
    /// Canonical plugin name derived from the artifact path
    pub fn plugin_name(&self) -> String {
        extract_plugin_name(&self.artifact_path)
    }
}

/// Why a descriptor produced no record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Unreadable(String),
    Malformed(String),
    MissingArtifact,
    MissingConfigExample,
    ConfigNotMapping,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable(e) => write!(f, "unreadable: {}", e),
            SkipReason::Malformed(e) => write!(f, "malformed YAML: {}", e),
            SkipReason::MissingArtifact => write!(f, "no spec.dynamicArtifact"),
            SkipReason::MissingConfigExample => write!(f, "no spec.appConfigExamples[0].content"),
            SkipReason::ConfigNotMapping => {
                write!(f, "spec.appConfigExamples[0].content is not a mapping")
            }
        }
    }
}

/// Result of parsing a single descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Found(PluginMetadata),
    Skipped(SkipReason),
}

impl ParseOutcome {
    pub fn into_record(self) -> Option<PluginMetadata> {
        match self {
            ParseOutcome::Found(record) => Some(record),
            ParseOutcome::Skipped(_) => None,
        }
    }
}

/// Read and parse one descriptor file. Never fails; problems become `Skipped`.
pub fn parse_descriptor(path: &Path) -> ParseOutcome {
    let outcome = match fs::read_to_string(path) {
        Ok(content) => parse_descriptor_content(&content, path),
        Err(e) => ParseOutcome::Skipped(SkipReason::Unreadable(e.to_string())),
    };

    match &outcome {
        ParseOutcome::Found(record) => {
            debug!("Loaded plugin metadata {} from {}", record.plugin_name(), path.display());
        }
        ParseOutcome::Skipped(reason @ (SkipReason::Unreadable(_) | SkipReason::Malformed(_))) => {
            warn!("Skipping plugin descriptor {}: {}", path.display(), reason);
        }
        ParseOutcome::Skipped(reason) => {
            debug!("Skipping plugin descriptor {}: {}", path.display(), reason);
        }
    }

    outcome
}

/// Parse descriptor text; `source` is recorded on the resulting metadata.
pub fn parse_descriptor_content(content: &str, source: &Path) -> ParseOutcome {
    let descriptor: Descriptor = match serde_yaml::from_str(content) {
        Ok(d) => d,
        Err(e) => return ParseOutcome::Skipped(SkipReason::Malformed(e.to_string())),
    };

    let Some(spec) = descriptor.spec else {
        return ParseOutcome::Skipped(SkipReason::MissingArtifact);
    };

    let Some(artifact_path) = spec.dynamic_artifact.filter(|a| !a.is_empty()) else {
        return ParseOutcome::Skipped(SkipReason::MissingArtifact);
    };

    // Only the first example is used.
    let content = spec
        .app_config_examples
        .into_iter()
        .next()
        .and_then(|example| example.content);

    let config = match content {
        None | Some(Value::Null) => {
            return ParseOutcome::Skipped(SkipReason::MissingConfigExample)
        }
        Some(Value::Mapping(config)) => config,
        Some(_) => return ParseOutcome::Skipped(SkipReason::ConfigNotMapping),
    };

    ParseOutcome::Found(PluginMetadata {
        artifact_path,
        config,
        name: spec.package_name.unwrap_or_default(),
        source_file: source.to_path_buf(),
    })
}

/// Plugin metadata keyed by canonical plugin name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataIndex {
    entries: BTreeMap<String, PluginMetadata>,
}

impl MetadataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its canonical name, returning any record it replaced
    pub fn insert(&mut self, record: PluginMetadata) -> Option<PluginMetadata> {
        self.entries.insert(record.plugin_name(), record)
    }

    pub fn get(&self, plugin_name: &str) -> Option<&PluginMetadata> {
        self.entries.get(plugin_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in plugin-name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, PluginMetadata> {
        self.entries.iter()
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl<'a> IntoIterator for &'a MetadataIndex {
    type Item = (&'a String, &'a PluginMetadata);
    type IntoIter = btree_map::Iter<'a, String, PluginMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<PluginMetadata> for MetadataIndex {
    fn from_iter<I: IntoIterator<Item = PluginMetadata>>(iter: I) -> Self {
        let mut index = Self::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

/// Outcome of scanning a metadata directory
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataScan {
    /// The path does not exist or is not a directory
    NotFound(PathBuf),
    Loaded(MetadataIndex),
}

impl MetadataScan {
    /// Turn `NotFound` into a fatal error naming the absolute path
    pub fn require(self) -> Result<MetadataIndex> {
        match self {
            MetadataScan::Loaded(index) => Ok(index),
            MetadataScan::NotFound(path) => Err(Error::metadata_dir_not_found(&path)),
        }
    }

    pub fn into_index(self) -> Option<MetadataIndex> {
        match self {
            MetadataScan::Loaded(index) => Some(index),
            MetadataScan::NotFound(_) => None,
        }
    }
}

/// Build a metadata index from the `*.yaml` files directly inside `dir`.
///
/// Files are processed in file-name order, so when two descriptors resolve to
/// the same plugin name the one whose file name sorts last wins.
pub fn scan_metadata_dir(dir: &Path) -> MetadataScan {
    if !dir.is_dir() {
        debug!("Plugin metadata directory {} not found", dir.display());
        return MetadataScan::NotFound(dir.to_path_buf());
    }

    let mut index = MetadataIndex::new();

    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!("Failed to read entry in {}: {}", dir.display(), err);
                None
            }
        })
        .filter(|e| {
            e.path().is_file()
                && e.path()
                    .extension()
                    .map(|ext| ext == "yaml")
                    .unwrap_or(false)
        })
    {
        if let Some(record) = parse_descriptor(entry.path()).into_record() {
            if let Some(previous) = index.insert(record) {
                debug!(
                    "Plugin metadata from {} replaced by {}",
                    previous.source_file.display(),
                    entry.path().display()
                );
            }
        }
    }

    info!("Loaded {} plugin metadata record(s) from {}", index.len(), dir.display());
    MetadataScan::Loaded(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn descriptor(artifact: &str, content: &str) -> String {
        format!(
            "apiVersion: extensions.backstage.io/v1alpha1\nkind: Package\nspec:\n  packageName: pkg\n  dynamicArtifact: {artifact}\n  appConfigExamples:\n    - title: Default\n      content:\n{content}\n"
        )
    }

    #[test]
    fn test_parse_descriptor_content() {
        let yaml = r#"
spec:
  packageName: "@backstage-community/plugin-tech-radar"
  dynamicArtifact: oci://quay.io/org/tech-radar:1.2.0!backstage-community-plugin-tech-radar
  appConfigExamples:
    - title: Default
      content:
        techRadar:
          url: https://example.com/radar.json
    - title: Alternate
      content:
        techRadar:
          url: https://example.com/other.json
"#;
        let record = parse_descriptor_content(yaml, Path::new("tech-radar.yaml"))
            .into_record()
            .unwrap();
        assert_eq!(record.plugin_name(), "tech-radar");
        assert_eq!(record.name, "@backstage-community/plugin-tech-radar");
        let expected: Mapping =
            serde_yaml::from_str("techRadar: {url: https://example.com/radar.json}").unwrap();
        assert_eq!(record.config, expected);
    }

    #[test]
    fn test_missing_fields_are_skipped() {
        let no_artifact = "spec:\n  appConfigExamples:\n    - content: {a: 1}\n";
        assert_eq!(
            parse_descriptor_content(no_artifact, Path::new("x.yaml")),
            ParseOutcome::Skipped(SkipReason::MissingArtifact)
        );

        let no_examples = "spec:\n  dynamicArtifact: ./dist/foo\n  appConfigExamples: []\n";
        assert_eq!(
            parse_descriptor_content(no_examples, Path::new("x.yaml")),
            ParseOutcome::Skipped(SkipReason::MissingConfigExample)
        );

        let scalar =
            "spec:\n  dynamicArtifact: ./dist/foo\n  appConfigExamples:\n    - content: text\n";
        assert_eq!(
            parse_descriptor_content(scalar, Path::new("x.yaml")),
            ParseOutcome::Skipped(SkipReason::ConfigNotMapping)
        );

        let unrelated = "kind: ConfigMap\ndata: {}\n";
        assert_eq!(
            parse_descriptor_content(unrelated, Path::new("x.yaml")),
            ParseOutcome::Skipped(SkipReason::MissingArtifact)
        );
    }

    #[test]
    fn test_malformed_yaml_is_skipped() {
        let outcome = parse_descriptor_content("spec: [unterminated", Path::new("bad.yaml"));
        assert!(matches!(outcome, ParseOutcome::Skipped(SkipReason::Malformed(_))));
    }

    #[test]
    fn test_scan_missing_dir_is_not_found() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("metadata");
        assert_eq!(scan_metadata_dir(&missing), MetadataScan::NotFound(missing.clone()));

        let file = dir.path().join("metadata.yaml");
        fs::write(&file, "a: 1").unwrap();
        assert_eq!(scan_metadata_dir(&file), MetadataScan::NotFound(file.clone()));
    }

    #[test]
    fn test_scan_builds_index() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("tech-radar.yaml"),
            descriptor("oci://quay.io/org/tech-radar:1.0!alias", "        a: 1"),
        )
        .unwrap();
        fs::write(
            dir.path().join("notifications.yaml"),
            descriptor("./dynamic-plugins/dist/notifications", "        b: 2"),
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "not a descriptor").unwrap();
        fs::write(dir.path().join("broken.yaml"), "spec: [").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/hidden.yaml"),
            descriptor("./dist/hidden", "        c: 3"),
        )
        .unwrap();

        let index = scan_metadata_dir(dir.path()).into_index().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.plugin_names().collect::<Vec<_>>(),
            vec!["notifications", "tech-radar"]
        );
        assert!(index.get("hidden").is_none());
    }

    #[test]
    fn test_scan_later_file_name_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("b-second.yaml"),
            descriptor("./dist/tech-radar", "        source: second"),
        )
        .unwrap();
        fs::write(
            dir.path().join("a-first.yaml"),
            descriptor("oci://quay.io/org/tech-radar:1.0", "        source: first"),
        )
        .unwrap();

        let index = scan_metadata_dir(dir.path()).into_index().unwrap();
        let record = index.get("tech-radar").unwrap();
        assert_eq!(record.artifact_path, "./dist/tech-radar");
        assert_eq!(record.source_file, dir.path().join("b-second.yaml"));
    }

    #[test]
    fn test_require_names_absolute_path() {
        let err = MetadataScan::NotFound(PathBuf::from("no/such/metadata"))
            .require()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("no/such/metadata"));
        assert!(matches!(err, Error::MetadataDirNotFound { ref path } if path.is_absolute()));
    }
}
