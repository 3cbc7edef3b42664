//! Configuration Commands
//!
//! Layered YAML merging; later files take precedence.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};

use devhub_e2e_common::{merge_yaml_files, merge_yaml_files_if_exists, MergeOptions};

use crate::output::{emit_document, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Deep-merge YAML files in order
    Merge(MergeArgs),
}

/// How sequences are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Overlay sequence replaces the base
    #[default]
    Replace,
    /// Overlay items are appended
    Concat,
    /// Items with equal key field are merged
    ByKey,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Files to merge, lowest precedence first
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Sequence merge strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Replace)]
    pub strategy: Strategy,

    /// Key field for `by-key`
    #[arg(short, long, default_value = "package")]
    pub key: String,

    /// Ignore files that do not exist
    #[arg(long)]
    pub if_exists: bool,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl MergeArgs {
    pub fn merge_options(&self) -> MergeOptions {
        match self.strategy {
            Strategy::Replace => MergeOptions::default(),
            Strategy::Concat => MergeOptions::concat(),
            Strategy::ByKey => MergeOptions::by_key(self.key.clone()),
        }
    }
}

pub async fn execute(cmd: ConfigCommands, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommands::Merge(args) => {
            let options = args.merge_options();
            let merged = if args.if_exists {
                merge_yaml_files_if_exists(&args.files, &options)?
            } else {
                merge_yaml_files(&args.files, &options)?
            };
            emit_document(&merged, args.output.as_deref(), format)
        }
    }
}
