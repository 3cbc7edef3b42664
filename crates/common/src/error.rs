//! Error types for DevHub E2E

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using the DevHub E2E Error
pub type Result<T> = std::result::Result<T, Error>;

/// DevHub E2E error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "Plugin metadata directory not found: {path}. \
         Create it or point the metadata directory at the plugin descriptors"
    )]
    MetadataDirNotFound { path: PathBuf },

    #[error("No usable plugin metadata descriptors found in {path}")]
    NoPluginMetadata { path: PathBuf },
}

impl Error {
    /// Build a `MetadataDirNotFound` error carrying the absolute form of `path`
    pub fn metadata_dir_not_found(path: &std::path::Path) -> Self {
        Error::MetadataDirNotFound {
            path: crate::absolute_path(path),
        }
    }

    /// Build a `NoPluginMetadata` error carrying the absolute form of `path`
    pub fn no_plugin_metadata(path: &std::path::Path) -> Self {
        Error::NoPluginMetadata {
            path: crate::absolute_path(path),
        }
    }
}
