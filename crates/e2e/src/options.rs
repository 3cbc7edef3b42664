//! Deployment options

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// How the application is installed into the cluster
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InstallMethod {
    #[default]
    Helm,
    Operator,
}

/// Authentication provider layer applied on top of the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    #[default]
    Keycloak,
    Guest,
}

impl InstallMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallMethod::Helm => "helm",
            InstallMethod::Operator => "operator",
        }
    }
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Keycloak => "keycloak",
            AuthProvider::Guest => "guest",
        }
    }
}

impl fmt::Display for InstallMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeploymentOptions {
    /// Target namespace
    pub namespace: String,

    /// Helm release / Backstage resource name
    pub release_name: String,

    pub method: InstallMethod,

    pub auth: AuthProvider,

    /// Helm chart reference
    pub chart: String,

    /// Chart version (None = latest)
    pub version: Option<String>,

    /// Project directory holding user layers
    /// (`app-config.yaml`, `dynamic-plugins.yaml`, `secrets.yaml`, `values.yaml`)
    pub config_dir: PathBuf,

    /// Plugin metadata descriptors
    pub metadata_dir: PathBuf,

    /// Where rendered files are written
    pub work_dir: PathBuf,

    /// Install/rollout timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self {
            namespace: "devhub-e2e".to_string(),
            release_name: "developer-hub".to_string(),
            method: InstallMethod::default(),
            auth: AuthProvider::default(),
            chart: "openshift-helm-charts/redhat-developer-hub".to_string(),
            version: None,
            config_dir: PathBuf::from("tests/config"),
            metadata_dir: devhub_e2e_common::default_metadata_dir(),
            work_dir: PathBuf::from("target/devhub-e2e"),
            timeout_secs: 600,
        }
    }
}

impl DeploymentOptions {
    /// Load options from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let options: Self = serde_yaml::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    /// Reject options that would produce an invalid install
    pub fn validate(&self) -> E2eResult<()> {
        if !is_dns_label(&self.namespace) {
            return Err(E2eError::InvalidOptions(format!(
                "namespace '{}' is not a valid DNS label",
                self.namespace
            )));
        }
        if !is_dns_label(&self.release_name) {
            return Err(E2eError::InvalidOptions(format!(
                "release name '{}' is not a valid DNS label",
                self.release_name
            )));
        }
        if self.method == InstallMethod::Helm && self.chart.is_empty() {
            return Err(E2eError::InvalidOptions("helm installs need a chart".to_string()));
        }
        Ok(())
    }

    /// Name of the ConfigMap carrying the merged app-config
    pub fn app_config_map(&self) -> String {
        "app-config".to_string()
    }

    /// Name of the ConfigMap carrying the dynamic plugins document
    pub fn dynamic_plugins_map(&self) -> String {
        format!("{}-dynamic-plugins", self.release_name)
    }

    /// Name of the Secret carrying the merged secrets
    pub fn secret_name(&self) -> String {
        "devhub-secrets".to_string()
    }
}

fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 63
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-')
}
