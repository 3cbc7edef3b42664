//! Metadata Commands

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use devhub_e2e_common::{scan_metadata_dir, MetadataIndex, DEFAULT_METADATA_DIR};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum MetadataCommands {
    /// List the plugin metadata records found in a directory
    List(ListArgs),
}

#[derive(Args)]
pub struct ListArgs {
    /// Directory holding plugin metadata descriptors
    #[arg(short, long, default_value = DEFAULT_METADATA_DIR)]
    pub metadata_dir: PathBuf,
}

/// One metadata record for display
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRow {
    pub plugin: String,
    pub package: String,
    pub artifact: String,
    pub source: String,
    pub config_keys: Vec<String>,
}

impl TableDisplay for MetadataRow {
    fn headers() -> Vec<&'static str> {
        vec!["Plugin", "Package", "Artifact", "Source", "Config Keys"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.plugin.clone(),
            if self.package.is_empty() { "-".to_string() } else { self.package.clone() },
            self.artifact.clone(),
            self.source.clone(),
            self.config_keys.join(", "),
        ]
    }
}

pub async fn execute(cmd: MetadataCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        MetadataCommands::List(args) => {
            let index = scan_metadata_dir(&args.metadata_dir).require()?;
            print_list(&rows(&index), format)
        }
    }
}

pub fn rows(index: &MetadataIndex) -> Vec<MetadataRow> {
    index
        .iter()
        .map(|(plugin, record)| MetadataRow {
            plugin: plugin.clone(),
            package: record.name.clone(),
            artifact: record.artifact_path.clone(),
            source: record
                .source_file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            config_keys: record
                .config
                .keys()
                .filter_map(|key| key.as_str().map(str::to_string))
                .collect(),
        })
        .collect()
}
