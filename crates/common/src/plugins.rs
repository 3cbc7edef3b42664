//! Dynamic plugins configuration and metadata injection

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gating::GatingDecision;
use crate::merge::deep_merge;
use crate::metadata::{scan_metadata_dir, MetadataIndex};
use crate::reference::extract_plugin_name;

/// A dynamic plugins document (`dynamic-plugins.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicPluginsConfig {
    /// Other plugin documents to include; passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginEntry>>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One plugin activation request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    /// Path or registry reference in any supported format
    pub package: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,

    /// Kept as written: an explicit `null` stays `Some(Value::Null)`
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub plugin_config: Option<Value>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Distinguish a present key (including `null`) from an absent one
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl DynamicPluginsConfig {
    /// Parse from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    /// Parse from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| Error::ParseFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Convert an already merged YAML value
    pub fn from_value(value: Value) -> Result<Self> {
        serde_yaml::from_value(value).map_err(Error::from)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(Error::from)
    }

    /// Number of plugin entries
    pub fn plugin_count(&self) -> usize {
        self.plugins.as_ref().map(Vec::len).unwrap_or(0)
    }
}

impl PluginEntry {
    /// Canonical plugin name of `package`
    pub fn plugin_name(&self) -> String {
        extract_plugin_name(&self.package)
    }
}

/// Fill each matching plugin's `pluginConfig` from metadata, user values winning.
///
/// Entries without metadata are returned unchanged and plugin order is kept.
pub fn inject_plugin_metadata(
    mut config: DynamicPluginsConfig,
    index: &MetadataIndex,
) -> DynamicPluginsConfig {
    let Some(plugins) = config.plugins.take() else {
        debug!("No plugins list present; nothing to inject");
        return config;
    };

    let mut injected = 0;
    let plugins = plugins
        .into_iter()
        .map(|entry| {
            let name = entry.plugin_name();
            match index.get(&name) {
                Some(metadata) => {
                    debug!("Injecting metadata config for {}", name);
                    injected += 1;
                    let defaults = Value::Mapping(metadata.config.clone());
                    let merged = match &entry.plugin_config {
                        None | Some(Value::Null) => defaults,
                        Some(user) => deep_merge(&defaults, user),
                    };
                    PluginEntry {
                        plugin_config: Some(merged),
                        ..entry
                    }
                }
                None => entry,
            }
        })
        .collect::<Vec<_>>();

    info!(
        "Injected plugin metadata into {} of {} plugin(s)",
        injected,
        plugins.len()
    );
    config.plugins = Some(plugins);
    config
}

/// Build a plugins document with one enabled entry per indexed plugin.
pub fn config_from_index(index: &MetadataIndex) -> DynamicPluginsConfig {
    let plugins = index
        .iter()
        .map(|(_, metadata)| PluginEntry {
            package: metadata.artifact_path.clone(),
            disabled: Some(false),
            plugin_config: Some(Value::Mapping(metadata.config.clone())),
            extra: BTreeMap::new(),
        })
        .collect();

    DynamicPluginsConfig {
        plugins: Some(plugins),
        ..Default::default()
    }
}

/// Generate a complete plugins document from the descriptors in `metadata_dir`.
///
/// Fails when the directory is missing or holds no usable descriptor.
pub fn generate_dynamic_plugins_config(metadata_dir: &Path) -> Result<DynamicPluginsConfig> {
    let index = scan_metadata_dir(metadata_dir).require()?;
    if index.is_empty() {
        return Err(Error::no_plugin_metadata(metadata_dir));
    }

    info!(
        "Generated dynamic plugins configuration with {} plugin(s) from {}",
        index.len(),
        metadata_dir.display()
    );
    Ok(config_from_index(&index))
}

/// Produce the plugins document handed to the deployment.
///
/// Disabled gating passes `config` through untouched. Otherwise an absent
/// document is generated from metadata and a present one has metadata
/// injected; both require `metadata_dir` to exist.
pub fn load_and_inject_plugin_metadata(
    config: Option<DynamicPluginsConfig>,
    metadata_dir: &Path,
    gating: &GatingDecision,
) -> Result<Option<DynamicPluginsConfig>> {
    if !gating.is_enabled() {
        info!("Plugin metadata handling {}; using plugin configuration as-is", gating);
        return Ok(config);
    }

    match config {
        None => generate_dynamic_plugins_config(metadata_dir).map(Some),
        Some(config) => {
            let index = scan_metadata_dir(metadata_dir).require()?;
            if index.is_empty() {
                warn!(
                    "No plugin metadata found in {}; plugin configuration left unchanged",
                    metadata_dir.display()
                );
            }
            Ok(Some(inject_plugin_metadata(config, &index)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gating::DisabledReason;
    use std::fs;
    use tempfile::TempDir;

    const TECH_RADAR: &str = r#"
spec:
  packageName: "@backstage-community/plugin-tech-radar"
  dynamicArtifact: oci://quay.io/org/tech-radar:1.2.0!backstage-community-plugin-tech-radar
  appConfigExamples:
    - title: Default
      content:
        techRadar:
          url: https://example.com/radar.json
          title: Radar
"#;

    const NOTIFICATIONS: &str = r#"
spec:
  dynamicArtifact: ./dynamic-plugins/dist/notifications
  appConfigExamples:
    - title: Default
      content:
        notifications:
          retention: 30d
"#;

    fn metadata_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("tech-radar.yaml"), TECH_RADAR).unwrap();
        fs::write(dir.path().join("notifications.yaml"), NOTIFICATIONS).unwrap();
        dir
    }

    fn value(yaml: &str) -> Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_roundtrip_keeps_passthrough_fields() {
        let yaml = r#"
includes:
  - dynamic-plugins.default.yaml
plugins:
  - package: ./dist/catalog
    disabled: false
    integrity: sha512-abc
"#;
        let config = DynamicPluginsConfig::from_yaml(yaml).unwrap();
        let entry = &config.plugins.as_ref().unwrap()[0];
        assert_eq!(entry.extra.get("integrity"), Some(&Value::from("sha512-abc")));
        assert_eq!(entry.plugin_config, None);

        let again = DynamicPluginsConfig::from_yaml(&config.to_yaml().unwrap()).unwrap();
        assert_eq!(again, config);
    }

    #[test]
    fn test_inject_user_values_win() {
        let dir = metadata_dir();
        let index = scan_metadata_dir(dir.path()).into_index().unwrap();
        let config = DynamicPluginsConfig::from_yaml(
            r#"
includes: [dynamic-plugins.default.yaml]
plugins:
  - package: oci://ghcr.io/other/tech-radar@sha256:ff!tech-radar
    disabled: false
    integrity: sha512-abc
    pluginConfig:
      techRadar:
        title: Mine
  - package: ./dist/catalog
    disabled: true
"#,
        )
        .unwrap();

        let injected = inject_plugin_metadata(config.clone(), &index);
        assert_eq!(injected.includes, config.includes);

        let plugins = injected.plugins.unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(
            plugins[0].package,
            "oci://ghcr.io/other/tech-radar@sha256:ff!tech-radar"
        );
        assert_eq!(plugins[0].disabled, Some(false));
        assert_eq!(plugins[0].extra.get("integrity"), Some(&Value::from("sha512-abc")));
        assert_eq!(
            plugins[0].plugin_config,
            Some(value("techRadar: {url: https://example.com/radar.json, title: Mine}"))
        );

        // No metadata for catalog: untouched, pluginConfig stays absent
        assert_eq!(plugins[1], config.plugins.unwrap()[1]);
    }

    #[test]
    fn test_unmatched_entries_keep_plugin_config_as_written() {
        let index = scan_metadata_dir(metadata_dir().path()).into_index().unwrap();
        let yaml = r#"
plugins:
  - package: ./dist/catalog
    pluginConfig: null
  - package: ./dist/search
    pluginConfig: disabled-by-ops
"#;
        let config = DynamicPluginsConfig::from_yaml(yaml).unwrap();
        let injected = inject_plugin_metadata(config.clone(), &index);
        assert_eq!(injected, config);

        let plugins = injected.plugins.as_ref().unwrap();
        assert_eq!(plugins[0].plugin_config, Some(Value::Null));
        assert_eq!(plugins[1].plugin_config, Some(Value::from("disabled-by-ops")));

        let rendered = injected.to_yaml().unwrap();
        assert!(rendered.contains("pluginConfig: null"), "{}", rendered);
    }

    #[test]
    fn test_inject_treats_null_plugin_config_as_absent() {
        let index = scan_metadata_dir(metadata_dir().path()).into_index().unwrap();
        let config = DynamicPluginsConfig::from_yaml(
            "plugins:\n  - package: ./dynamic-plugins/dist/notifications\n    pluginConfig: null\n",
        )
        .unwrap();

        let plugins = inject_plugin_metadata(config, &index).plugins.unwrap();
        assert_eq!(
            plugins[0].plugin_config,
            Some(value("notifications: {retention: 30d}"))
        );
    }

    #[test]
    fn test_inject_fills_absent_plugin_config() {
        let dir = metadata_dir();
        let index = scan_metadata_dir(dir.path()).into_index().unwrap();
        let config = DynamicPluginsConfig::from_yaml(
            "plugins:\n  - package: ./dynamic-plugins/dist/notifications\n",
        )
        .unwrap();

        let plugins = inject_plugin_metadata(config, &index).plugins.unwrap();
        assert_eq!(
            plugins[0].plugin_config,
            Some(value("notifications: {retention: 30d}"))
        );
        assert_eq!(plugins[0].disabled, None);
    }

    #[test]
    fn test_inject_without_plugins_list_is_unchanged() {
        let index = scan_metadata_dir(metadata_dir().path()).into_index().unwrap();
        let config = DynamicPluginsConfig::from_yaml("includes: [a.yaml]\n").unwrap();
        assert_eq!(inject_plugin_metadata(config.clone(), &index), config);
    }

    #[test]
    fn test_generate_from_metadata() {
        let dir = metadata_dir();
        let config = generate_dynamic_plugins_config(dir.path()).unwrap();
        let plugins = config.plugins.unwrap();
        assert_eq!(plugins.len(), 2);
        assert!(plugins.iter().all(|p| p.disabled == Some(false)));

        let radar = plugins.iter().find(|p| p.plugin_name() == "tech-radar").unwrap();
        assert_eq!(
            radar.package,
            "oci://quay.io/org/tech-radar:1.2.0!backstage-community-plugin-tech-radar"
        );
        assert_eq!(
            radar.plugin_config,
            Some(value("techRadar: {url: https://example.com/radar.json, title: Radar}"))
        );

        let notifications = plugins
            .iter()
            .find(|p| p.plugin_name() == "notifications")
            .unwrap();
        assert_eq!(
            notifications.plugin_config,
            Some(value("notifications: {retention: 30d}"))
        );
    }

    #[test]
    fn test_generate_missing_dir_names_path() {
        let err = generate_dynamic_plugins_config(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, Error::MetadataDirNotFound { .. }));
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn test_generate_empty_dir_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("unrelated.yaml"), "kind: ConfigMap\n").unwrap();
        let err = generate_dynamic_plugins_config(dir.path()).unwrap_err();
        assert!(matches!(err, Error::NoPluginMetadata { .. }));
    }

    #[test]
    fn test_orchestration_disabled_is_passthrough() {
        let gating = GatingDecision::evaluate(None, Some("periodic-nightly-1"));
        let dir = metadata_dir();
        let config =
            DynamicPluginsConfig::from_yaml("plugins:\n  - package: ./dist/tech-radar\n").unwrap();

        let result =
            load_and_inject_plugin_metadata(Some(config.clone()), dir.path(), &gating).unwrap();
        assert_eq!(result, Some(config));

        let absent = load_and_inject_plugin_metadata(
            None,
            Path::new("/no/such/dir"),
            &GatingDecision::Disabled(DisabledReason::OptOut),
        )
        .unwrap();
        assert_eq!(absent, None);
    }

    #[test]
    fn test_orchestration_enabled() {
        let dir = metadata_dir();
        let generated =
            load_and_inject_plugin_metadata(None, dir.path(), &GatingDecision::Enabled)
                .unwrap()
                .unwrap();
        assert_eq!(generated.plugin_count(), 2);

        let config =
            DynamicPluginsConfig::from_yaml("plugins:\n  - package: ./dist/tech-radar\n").unwrap();
        let injected =
            load_and_inject_plugin_metadata(Some(config), dir.path(), &GatingDecision::Enabled)
                .unwrap()
                .unwrap();
        assert!(injected.plugins.unwrap()[0].plugin_config.is_some());
    }

    #[test]
    fn test_orchestration_injection_requires_dir() {
        let config = DynamicPluginsConfig::from_yaml("plugins: []\n").unwrap();
        let err = load_and_inject_plugin_metadata(
            Some(config),
            Path::new("/no/such/dir"),
            &GatingDecision::Enabled,
        )
        .unwrap_err();
        assert!(matches!(err, Error::MetadataDirNotFound { .. }));
    }
}
