//! DevHub E2E Common Library
//!
//! Plugin metadata loading and the layered configuration pipeline shared by
//! the deployment harness and the CLI.
//!
//! ```text
//! metadata/*.yaml ──► scan_metadata_dir ──► MetadataIndex
//!                                               │
//! dynamic-plugins.yaml ─────────────────────────┤
//!                                               ▼
//!                          load_and_inject_plugin_metadata ──► DynamicPluginsConfig
//! ```

pub mod envsubst;
pub mod error;
pub mod gating;
pub mod merge;
pub mod metadata;
pub mod plugins;
pub mod reference;

// Re-export commonly used types
pub use envsubst::{substitute_env, substitute_env_from_process, substitute_env_in_value};
pub use error::{Error, Result};
pub use gating::{DisabledReason, GatingDecision};
pub use merge::{
    deep_merge, deep_merge_with, merge_yaml_files, merge_yaml_files_if_exists, parse_yaml,
    read_yaml, write_yaml, ArrayMergeStrategy, MergeOptions,
};
pub use metadata::{
    parse_descriptor, scan_metadata_dir, MetadataIndex, MetadataScan, ParseOutcome,
    PluginMetadata, SkipReason,
};
pub use plugins::{
    generate_dynamic_plugins_config, inject_plugin_metadata, load_and_inject_plugin_metadata,
    DynamicPluginsConfig, PluginEntry,
};
pub use reference::extract_plugin_name;

/// DevHub E2E version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default plugin metadata directory, relative to the consuming project
pub const DEFAULT_METADATA_DIR: &str = "../metadata";

/// Default metadata directory as a path
pub fn default_metadata_dir() -> std::path::PathBuf {
    std::path::PathBuf::from(DEFAULT_METADATA_DIR)
}

/// Resolve `path` against the current directory without touching the filesystem.
///
/// Falls back to the path as given when the current directory is unavailable.
pub fn absolute_path(path: &std::path::Path) -> std::path::PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
