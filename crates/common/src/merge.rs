//! Deep merge of YAML values and layered YAML files
//!
//! Mappings merge key by key, recursively. Any other pair of values resolves
//! to the overlay side, except for sequences, whose handling is chosen by
//! [`ArrayMergeStrategy`]. Inputs are never modified; every merge returns a
//! new value.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{Error, Result};

/// How two sequences found under the same key are combined
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArrayMergeStrategy {
    /// The overlay sequence wins outright
    #[default]
    Replace,
    /// Overlay items are appended to the base items
    Concat,
    /// Mapping items sharing the same value for the field are merged in place;
    /// everything else from the overlay is appended
    ByKey(String),
}

/// Options for [`deep_merge_with`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub arrays: ArrayMergeStrategy,
}

impl MergeOptions {
    /// Merge sequences of mappings by the given field
    pub fn by_key(key: impl Into<String>) -> Self {
        Self {
            arrays: ArrayMergeStrategy::ByKey(key.into()),
        }
    }

    /// Concatenate sequences
    pub fn concat() -> Self {
        Self {
            arrays: ArrayMergeStrategy::Concat,
        }
    }
}

/// Merge `overlay` onto `base`; overlay values win on conflicts and sequences are replaced.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    deep_merge_with(base, overlay, &MergeOptions::default())
}

/// Merge `overlay` onto `base` using the given options.
pub fn deep_merge_with(base: &Value, overlay: &Value, options: &MergeOptions) -> Value {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            Value::Mapping(merge_mappings(base, overlay, options))
        }
        (Value::Sequence(base), Value::Sequence(overlay)) => {
            Value::Sequence(merge_sequences(base, overlay, options))
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Mapping-level form of [`deep_merge_with`].
pub fn merge_mappings(base: &Mapping, overlay: &Mapping, options: &MergeOptions) -> Mapping {
    let mut merged = base.clone();
    for (key, value) in overlay {
        let next = match merged.get(key) {
            Some(existing) => deep_merge_with(existing, value, options),
            None => value.clone(),
        };
        merged.insert(key.clone(), next);
    }
    merged
}

fn merge_sequences(base: &[Value], overlay: &[Value], options: &MergeOptions) -> Vec<Value> {
    match &options.arrays {
        ArrayMergeStrategy::Replace => overlay.to_vec(),
        ArrayMergeStrategy::Concat => base.iter().chain(overlay).cloned().collect(),
        ArrayMergeStrategy::ByKey(field) => {
            let mut merged = base.to_vec();
            for item in overlay {
                let position = key_of(item, field)
                    .and_then(|id| merged.iter().position(|m| key_of(m, field) == Some(id)));
                match position {
                    Some(idx) => merged[idx] = deep_merge_with(&merged[idx], item, options),
                    None => merged.push(item.clone()),
                }
            }
            merged
        }
    }
}

fn key_of<'a>(item: &'a Value, field: &str) -> Option<&'a Value> {
    item.as_mapping().and_then(|m| m.get(field))
}

/// Parse a YAML document; an empty or comment-only document is an empty mapping.
pub fn parse_yaml(content: &str) -> std::result::Result<Value, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Value::Mapping(Mapping::new()));
    }

    Ok(match serde_yaml::from_str(content)? {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Read a YAML file with [`parse_yaml`]
pub fn read_yaml(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_yaml(&content).map_err(|source| Error::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge YAML files in order; later files take precedence.
pub fn merge_yaml_files<P: AsRef<Path>>(paths: &[P], options: &MergeOptions) -> Result<Value> {
    let mut merged = Value::Mapping(Mapping::new());
    for path in paths {
        let path = path.as_ref();
        debug!("Merging YAML layer {}", path.display());
        let layer = read_yaml(path)?;
        merged = deep_merge_with(&merged, &layer, options);
    }
    Ok(merged)
}

/// Like [`merge_yaml_files`], skipping paths that do not exist.
pub fn merge_yaml_files_if_exists<P: AsRef<Path>>(
    paths: &[P],
    options: &MergeOptions,
) -> Result<Value> {
    let existing: Vec<&Path> = paths
        .iter()
        .map(AsRef::<Path>::as_ref)
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                debug!("Skipping missing YAML layer {}", path.display());
            }
            exists
        })
        .collect();

    merge_yaml_files(&existing, options)
}

/// Serialize `value` as YAML to `path`, creating parent directories.
pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(value)?;
    fs::write(path, content)?;
    Ok(())
}
