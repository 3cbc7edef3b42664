//! Plugin Commands
//!
//! Name derivation plus generation and injection of dynamic plugin configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use devhub_e2e_common::{
    extract_plugin_name, load_and_inject_plugin_metadata, DynamicPluginsConfig, GatingDecision,
    DEFAULT_METADATA_DIR,
};

use crate::output::{emit_document, print_info, print_list, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum PluginsCommands {
    /// Derive canonical plugin names from package references
    Name(NameArgs),

    /// Generate a dynamic plugins document from plugin metadata
    Generate(GenerateArgs),

    /// Inject plugin metadata defaults into an existing dynamic plugins file
    Inject(InjectArgs),
}

#[derive(Args)]
pub struct NameArgs {
    /// Package references (OCI, local path, npm, tarball)
    #[arg(required = true)]
    pub references: Vec<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Directory holding plugin metadata descriptors
    #[arg(short, long, default_value = DEFAULT_METADATA_DIR)]
    pub metadata_dir: PathBuf,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InjectArgs {
    /// Dynamic plugins file to augment
    pub file: PathBuf,

    /// Directory holding plugin metadata descriptors
    #[arg(short, long, default_value = DEFAULT_METADATA_DIR)]
    pub metadata_dir: PathBuf,

    /// Write the document here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// A package reference and the name derived from it
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PluginName {
    pub reference: String,
    pub name: String,
}

impl TableDisplay for PluginName {
    fn headers() -> Vec<&'static str> {
        vec!["Reference", "Plugin Name"]
    }

    fn row(&self) -> Vec<String> {
        vec![self.reference.clone(), self.name.clone()]
    }
}

pub async fn execute(
    cmd: PluginsCommands,
    gating: &GatingDecision,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        PluginsCommands::Name(args) => print_list(&plugin_names(&args.references), format),
        PluginsCommands::Generate(args) => generate(args, gating, format),
        PluginsCommands::Inject(args) => inject(args, gating, format),
    }
}

pub fn plugin_names(references: &[String]) -> Vec<PluginName> {
    references
        .iter()
        .map(|reference| PluginName {
            reference: reference.clone(),
            name: extract_plugin_name(reference),
        })
        .collect()
}

fn generate(args: GenerateArgs, gating: &GatingDecision, format: OutputFormat) -> Result<()> {
    match load_and_inject_plugin_metadata(None, &args.metadata_dir, gating)? {
        Some(config) => {
            emit_document(&config, args.output.as_deref(), format)?;
            print_info(&format!(
                "Generated {} plugin(s) from {}",
                config.plugin_count(),
                args.metadata_dir.display()
            ));
        }
        None => print_info(&format!("Plugin metadata handling {}; nothing generated", gating)),
    }
    Ok(())
}

fn inject(args: InjectArgs, gating: &GatingDecision, format: OutputFormat) -> Result<()> {
    let config = inject_file(&args.file, &args.metadata_dir, gating)?;
    emit_document(&config, args.output.as_deref(), format)
}

/// Load `file` and run it through the metadata pipeline
pub fn inject_file(
    file: &Path,
    metadata_dir: &Path,
    gating: &GatingDecision,
) -> Result<DynamicPluginsConfig> {
    let config = DynamicPluginsConfig::from_file(file)
        .with_context(|| format!("loading {}", file.display()))?;
    let config = load_and_inject_plugin_metadata(Some(config), metadata_dir, gating)?;
    Ok(config.unwrap_or_default())
}
