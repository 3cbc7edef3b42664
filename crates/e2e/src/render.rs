//! Rendering a deployment's configuration to disk

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use devhub_e2e_common::{
    deep_merge, deep_merge_with, load_and_inject_plugin_metadata, write_yaml,
    DynamicPluginsConfig, GatingDecision,
};
use serde_yaml::{Mapping, Value};
use tracing::info;

use crate::error::E2eResult;
use crate::layers::{builtin_layers, layers_for, merge_layers, user_layer, ConfigKind, EnvLookup};
use crate::manifests;
use crate::options::{DeploymentOptions, InstallMethod};

/// Files written by [`render_deployment`]
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFiles {
    pub app_config: PathBuf,
    pub dynamic_plugins: PathBuf,
    pub secrets: PathBuf,
    /// Helm installs only
    pub helm_values: Option<PathBuf>,
    /// Kubernetes manifests, in apply order
    pub manifests: Vec<PathBuf>,
}

/// Fully merged configuration for one deployment
#[derive(Debug, Clone)]
pub struct RenderedDeployment {
    pub options: DeploymentOptions,
    pub app_config: Value,
    pub dynamic_plugins: DynamicPluginsConfig,
    pub secrets: BTreeMap<String, String>,
    pub helm_values: Option<Value>,
    pub files: RenderedFiles,
}

/// Render using the process environment for secret substitution
pub fn render_deployment(
    options: &DeploymentOptions,
    gating: &GatingDecision,
) -> E2eResult<RenderedDeployment> {
    render_deployment_with_env(options, gating, &|name| std::env::var(name).ok())
}

/// Merge all layers, run plugin metadata handling and write the results to
/// `options.work_dir`.
pub fn render_deployment_with_env(
    options: &DeploymentOptions,
    gating: &GatingDecision,
    env: EnvLookup<'_>,
) -> E2eResult<RenderedDeployment> {
    options.validate()?;
    info!(
        "Rendering {} deployment {} (auth: {}, metadata: {})",
        options.method, options.release_name, options.auth, gating
    );

    let app_config = merge_layers(
        &layers_for(ConfigKind::AppConfig, options),
        &ConfigKind::AppConfig.merge_options(),
        None,
    )?;

    let dynamic_plugins = render_dynamic_plugins(options, gating)?;

    let secrets = merge_layers(
        &layers_for(ConfigKind::Secrets, options),
        &ConfigKind::Secrets.merge_options(),
        Some(env),
    )?;
    let secrets = manifests::secret_string_data(secrets.as_mapping().unwrap_or(&Mapping::new()))?;

    let helm_values = match options.method {
        InstallMethod::Helm => Some(render_helm_values(options, &dynamic_plugins)?),
        InstallMethod::Operator => None,
    };

    let files = write_files(
        options,
        &app_config,
        &dynamic_plugins,
        &secrets,
        helm_values.as_ref(),
    )?;

    Ok(RenderedDeployment {
        options: options.clone(),
        app_config,
        dynamic_plugins,
        secrets,
        helm_values,
        files,
    })
}

/// Dynamic plugins from the layers plus plugin metadata.
///
/// Without a user layer the plugin list is generated from metadata and merged
/// over the builtin layers; with one, metadata is injected into the merged list.
fn render_dynamic_plugins(
    options: &DeploymentOptions,
    gating: &GatingDecision,
) -> E2eResult<DynamicPluginsConfig> {
    let kind = ConfigKind::DynamicPlugins;
    let merge_options = kind.merge_options();
    let base = merge_layers(&builtin_layers(kind, options.auth), &merge_options, None)?;

    let config = match user_layer(kind, options).load(None)? {
        Some(user) => {
            let merged = deep_merge_with(&base, &user, &merge_options);
            let merged = DynamicPluginsConfig::from_value(merged)?;
            load_and_inject_plugin_metadata(Some(merged), &options.metadata_dir, gating)?
                .unwrap_or_default()
        }
        None => match load_and_inject_plugin_metadata(None, &options.metadata_dir, gating)? {
            Some(generated) => {
                let generated = serde_yaml::to_value(&generated)?;
                let merged = deep_merge_with(&base, &generated, &merge_options);
                DynamicPluginsConfig::from_value(merged)?
            }
            None => DynamicPluginsConfig::from_value(base)?,
        },
    };

    info!("Dynamic plugins: {} plugin(s)", config.plugin_count());
    Ok(config)
}

fn render_helm_values(
    options: &DeploymentOptions,
    dynamic_plugins: &DynamicPluginsConfig,
) -> E2eResult<Value> {
    let values = merge_layers(
        &layers_for(ConfigKind::HelmValues, options),
        &ConfigKind::HelmValues.merge_options(),
        None,
    )?;
    let mut global = Mapping::new();
    global.insert(Value::from("dynamic"), serde_yaml::to_value(dynamic_plugins)?);
    let mut overlay = Mapping::new();
    overlay.insert(Value::from("global"), Value::Mapping(global));
    Ok(deep_merge(&values, &Value::Mapping(overlay)))
}

fn write_files(
    options: &DeploymentOptions,
    app_config: &Value,
    dynamic_plugins: &DynamicPluginsConfig,
    secrets: &BTreeMap<String, String>,
    helm_values: Option<&Value>,
) -> E2eResult<RenderedFiles> {
    let work_dir = &options.work_dir;
    let manifest_dir = work_dir.join("manifests");
    fs::create_dir_all(&manifest_dir)?;

    let app_config_path = work_dir.join(ConfigKind::AppConfig.file_name());
    let dynamic_plugins_path = work_dir.join(ConfigKind::DynamicPlugins.file_name());
    let secrets_path = work_dir.join(ConfigKind::Secrets.file_name());
    write_yaml(&app_config_path, app_config)?;
    write_yaml(&dynamic_plugins_path, dynamic_plugins)?;
    write_yaml(&secrets_path, secrets)?;

    let helm_values_path = match helm_values {
        Some(values) => {
            let path = work_dir.join(ConfigKind::HelmValues.file_name());
            write_yaml(&path, values)?;
            Some(path)
        }
        None => None,
    };

    let mut rendered = vec![
        ("00-namespace.yaml", manifests::namespace(&options.namespace)),
        (
            "10-app-config.yaml",
            manifests::config_map(
                &options.app_config_map(),
                &options.namespace,
                ConfigKind::AppConfig.file_name(),
                &serde_yaml::to_string(app_config)?,
            ),
        ),
        (
            "20-secrets.yaml",
            manifests::secret(&options.secret_name(), &options.namespace, secrets),
        ),
    ];

    if options.method == InstallMethod::Operator {
        rendered.push((
            "30-dynamic-plugins.yaml",
            manifests::config_map(
                &options.dynamic_plugins_map(),
                &options.namespace,
                ConfigKind::DynamicPlugins.file_name(),
                &dynamic_plugins.to_yaml()?,
            ),
        ));
        rendered.push(("40-backstage.yaml", manifests::backstage(options)));
    }

    let mut manifest_paths = Vec::with_capacity(rendered.len());
    for (name, manifest) in rendered {
        let path = manifest_dir.join(name);
        write_yaml(&path, &manifest)?;
        manifest_paths.push(path);
    }

    info!("Rendered deployment files to {}", work_dir.display());

    Ok(RenderedFiles {
        app_config: app_config_path,
        dynamic_plugins: dynamic_plugins_path,
        secrets: secrets_path,
        helm_values: helm_values_path,
        manifests: manifest_paths,
    })
}
