//! Deployment Commands
//!
//! Render, install and remove an application instance for end-to-end tests.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use devhub_e2e::{
    render_deployment, AuthProvider, Deployment, DeploymentOptions, InstallMethod, ProcessRunner,
    RenderedDeployment,
};
use devhub_e2e_common::GatingDecision;

use crate::output::{print_list, print_success, print_warning, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum DeployCommands {
    /// Merge configuration and write files and manifests without installing
    Render(DeployArgs),

    /// Render and install into the cluster
    Apply(DeployArgs),

    /// Uninstall a previously applied deployment
    Teardown(DeployArgs),
}

#[derive(Args, Default)]
pub struct DeployArgs {
    /// Deployment options file (YAML)
    #[arg(short = 'f', long)]
    pub options: Option<PathBuf>,

    /// Target namespace
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Install method
    #[arg(short, long, value_enum)]
    pub method: Option<InstallMethod>,

    /// Authentication provider layer
    #[arg(short, long, value_enum)]
    pub auth: Option<AuthProvider>,

    /// Project directory with user configuration layers
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Plugin metadata directory
    #[arg(long)]
    pub metadata_dir: Option<PathBuf>,

    /// Directory for rendered files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Helm chart version
    #[arg(long)]
    pub chart_version: Option<String>,
}

impl DeployArgs {
    /// Options file (or defaults) with command line overrides applied
    pub fn resolve(self) -> Result<DeploymentOptions> {
        let mut options = match &self.options {
            Some(path) => DeploymentOptions::load(path)
                .with_context(|| format!("loading deployment options from {}", path.display()))?,
            None => DeploymentOptions::default(),
        };

        if let Some(namespace) = self.namespace {
            options.namespace = namespace;
        }
        if let Some(method) = self.method {
            options.method = method;
        }
        if let Some(auth) = self.auth {
            options.auth = auth;
        }
        if let Some(dir) = self.config_dir {
            options.config_dir = dir;
        }
        if let Some(dir) = self.metadata_dir {
            options.metadata_dir = dir;
        }
        if let Some(dir) = self.work_dir {
            options.work_dir = dir;
        }
        if self.chart_version.is_some() {
            options.version = self.chart_version;
        }

        options.validate()?;
        Ok(options)
    }
}

/// A rendered file for display
#[derive(Serialize, Clone, Debug)]
pub struct RenderedFile {
    pub kind: String,
    pub path: String,
}

impl TableDisplay for RenderedFile {
    fn headers() -> Vec<&'static str> {
        vec!["Kind", "Path"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.kind.clone(), self.path.clone()]
    }
}

pub async fn execute(
    cmd: DeployCommands,
    gating: GatingDecision,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        DeployCommands::Render(args) => {
            let options = args.resolve()?;
            let rendered = render_deployment(&options, &gating)?;
            print_list(&rendered_files(&rendered), format)?;
            print_success(&format!(
                "Rendered {} with {} plugin(s)",
                options.release_name,
                rendered.dynamic_plugins.plugin_count()
            ));
        }
        DeployCommands::Apply(args) => {
            let options = args.resolve()?;
            let mut deployment = Deployment::new(options, gating)?;
            if !deployment.gating().is_enabled() {
                print_warning(&format!("Plugin metadata handling {}", deployment.gating()));
            }
            deployment.deploy(&ProcessRunner).await?;
            print_success(&format!(
                "Deployed {} into namespace {}",
                deployment.options().release_name,
                deployment.options().namespace
            ));
        }
        DeployCommands::Teardown(args) => {
            let options = args.resolve()?;
            let deployment = Deployment::new(options, gating)?;
            deployment.teardown(&ProcessRunner).await?;
            print_success(&format!("Removed {}", deployment.options().release_name));
        }
    }
    Ok(())
}

pub fn rendered_files(rendered: &RenderedDeployment) -> Vec<RenderedFile> {
    let files = &rendered.files;
    let mut out = vec![
        file("app-config", &files.app_config),
        file("dynamic-plugins", &files.dynamic_plugins),
        file("secrets", &files.secrets),
    ];
    if let Some(values) = &files.helm_values {
        out.push(file("helm-values", values));
    }
    out.extend(files.manifests.iter().map(|path| file("manifest", path)));
    out
}

fn file(kind: &str, path: &std::path::Path) -> RenderedFile {
    RenderedFile {
        kind: kind.to_string(),
        path: path.display().to_string(),
    }
}
