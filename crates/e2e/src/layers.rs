//! Configuration layers: package defaults -> auth provider -> user project
//!
//! Defaults and auth layers ship with this crate (`config/`); the user layer
//! is read from [`DeploymentOptions::config_dir`] and may be missing.

use std::fmt;
use std::path::PathBuf;

use devhub_e2e_common::{
    deep_merge_with, parse_yaml, read_yaml, substitute_env_in_value, MergeOptions,
};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::E2eResult;
use crate::options::{AuthProvider, DeploymentOptions};

const DEFAULT_APP_CONFIG: &str = include_str!("../config/app-config.yaml");
const DEFAULT_DYNAMIC_PLUGINS: &str = include_str!("../config/dynamic-plugins.yaml");
const DEFAULT_SECRETS: &str = include_str!("../config/secrets.yaml");
const DEFAULT_HELM_VALUES: &str = include_str!("../config/helm/values.yaml");

const KEYCLOAK_APP_CONFIG: &str = include_str!("../config/auth/keycloak/app-config.yaml");
const KEYCLOAK_DYNAMIC_PLUGINS: &str = include_str!("../config/auth/keycloak/dynamic-plugins.yaml");
const KEYCLOAK_SECRETS: &str = include_str!("../config/auth/keycloak/secrets.yaml");
const GUEST_APP_CONFIG: &str = include_str!("../config/auth/guest/app-config.yaml");

/// Kind of configuration assembled from layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    AppConfig,
    DynamicPlugins,
    Secrets,
    HelmValues,
}

impl ConfigKind {
    /// File name used for the user layer and the rendered output
    pub fn file_name(&self) -> &'static str {
        match self {
            ConfigKind::AppConfig => "app-config.yaml",
            ConfigKind::DynamicPlugins => "dynamic-plugins.yaml",
            ConfigKind::Secrets => "secrets.yaml",
            ConfigKind::HelmValues => "values.yaml",
        }
    }

    /// How sequences from different layers combine
    pub fn merge_options(&self) -> MergeOptions {
        match self {
            ConfigKind::DynamicPlugins => MergeOptions::by_key("package"),
            _ => MergeOptions::default(),
        }
    }
}

/// One configuration layer
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigLayer {
    /// Shipped with this crate
    Embedded {
        name: &'static str,
        content: &'static str,
    },
    /// Read from disk; skipped when missing
    File(PathBuf),
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::Embedded { name, .. } => write!(f, "builtin:{}", name),
            ConfigLayer::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Variable lookup used for `${VAR}` substitution
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

impl ConfigLayer {
    /// Load the layer, substituting variables in string values when `env` is given.
    ///
    /// Returns `None` for a file layer that does not exist.
    pub fn load(&self, env: Option<EnvLookup<'_>>) -> E2eResult<Option<Value>> {
        let value = match self {
            ConfigLayer::Embedded { content, .. } => parse_yaml(content)?,
            ConfigLayer::File(path) => {
                if !path.is_file() {
                    debug!("Layer {} not present", path.display());
                    return Ok(None);
                }
                read_yaml(path)?
            }
        };

        Ok(Some(match env {
            Some(lookup) => substitute_env_in_value(&value, lookup),
            None => value,
        }))
    }
}

/// Layers shipped with this crate for `kind`, defaults first
pub fn builtin_layers(kind: ConfigKind, auth: AuthProvider) -> Vec<ConfigLayer> {
    let defaults = match kind {
        ConfigKind::AppConfig => DEFAULT_APP_CONFIG,
        ConfigKind::DynamicPlugins => DEFAULT_DYNAMIC_PLUGINS,
        ConfigKind::Secrets => DEFAULT_SECRETS,
        ConfigKind::HelmValues => DEFAULT_HELM_VALUES,
    };

    let mut layers = vec![ConfigLayer::Embedded {
        name: kind.file_name(),
        content: defaults,
    }];

    let auth_layer = match (auth, kind) {
        (AuthProvider::Keycloak, ConfigKind::AppConfig) => Some(KEYCLOAK_APP_CONFIG),
        (AuthProvider::Keycloak, ConfigKind::DynamicPlugins) => Some(KEYCLOAK_DYNAMIC_PLUGINS),
        (AuthProvider::Keycloak, ConfigKind::Secrets) => Some(KEYCLOAK_SECRETS),
        (AuthProvider::Guest, ConfigKind::AppConfig) => Some(GUEST_APP_CONFIG),
        _ => None,
    };

    if let Some(content) = auth_layer {
        layers.push(ConfigLayer::Embedded {
            name: auth.as_str(),
            content,
        });
    }

    layers
}

/// The user project layer for `kind`
pub fn user_layer(kind: ConfigKind, options: &DeploymentOptions) -> ConfigLayer {
    ConfigLayer::File(options.config_dir.join(kind.file_name()))
}

/// All layers for `kind`: defaults, auth provider, user project
pub fn layers_for(kind: ConfigKind, options: &DeploymentOptions) -> Vec<ConfigLayer> {
    let mut layers = builtin_layers(kind, options.auth);
    layers.push(user_layer(kind, options));
    layers
}

/// Merge layers in order; missing file layers are skipped.
pub fn merge_layers(
    layers: &[ConfigLayer],
    options: &MergeOptions,
    env: Option<EnvLookup<'_>>,
) -> E2eResult<Value> {
    let mut merged = Value::Mapping(Mapping::new());
    for layer in layers {
        if let Some(value) = layer.load(env)? {
            debug!("Merging layer {}", layer);
            merged = deep_merge_with(&merged, &value, options);
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_layers_parse() {
        for auth in [AuthProvider::Keycloak, AuthProvider::Guest] {
            for kind in [
                ConfigKind::AppConfig,
                ConfigKind::DynamicPlugins,
                ConfigKind::Secrets,
                ConfigKind::HelmValues,
            ] {
                for layer in builtin_layers(kind, auth) {
                    let value = layer.load(None).unwrap().unwrap();
                    assert!(value.is_mapping(), "{} is not a mapping", layer);
                }
            }
        }
    }

    #[test]
    fn test_guest_has_no_secret_layer() {
        assert_eq!(builtin_layers(ConfigKind::Secrets, AuthProvider::Guest).len(), 1);
        assert_eq!(builtin_layers(ConfigKind::Secrets, AuthProvider::Keycloak).len(), 2);
    }

    #[test]
    fn test_user_layer_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("app-config.yaml"), "app:\n  title: Showcase\n").unwrap();
        let options = DeploymentOptions {
            config_dir: dir.path().to_path_buf(),
            auth: AuthProvider::Guest,
            ..Default::default()
        };

        let merged = merge_layers(
            &layers_for(ConfigKind::AppConfig, &options),
            &MergeOptions::default(),
            None,
        )
        .unwrap();
        assert_eq!(merged["app"]["title"], Value::from("Showcase"));
        assert_eq!(merged["signInPage"], Value::from("guest"));
        assert!(merged["backend"]["baseUrl"].is_string());
    }

    #[test]
    fn test_missing_user_layer_is_skipped() {
        let options = DeploymentOptions {
            config_dir: PathBuf::from("/no/such/config"),
            ..Default::default()
        };
        assert_eq!(user_layer(ConfigKind::Secrets, &options).load(None).unwrap(), None);
    }

    #[test]
    fn test_substitution_applies_to_layers() {
        let lookup = |name: &str| (name == "BACKEND_SECRET").then(|| "s3cr3t".to_string());
        let merged = merge_layers(
            &builtin_layers(ConfigKind::Secrets, AuthProvider::Guest),
            &MergeOptions::default(),
            Some(&lookup),
        )
        .unwrap();
        assert_eq!(merged["BACKEND_SECRET"], Value::from("s3cr3t"));
        assert_eq!(merged["DEVHUB_BASE_URL"], Value::from(""));
    }
}
