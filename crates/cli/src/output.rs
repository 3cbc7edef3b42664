//! Output formatting for CLI

use std::path::Path;

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Render a list of items in the requested format
pub fn render_list<T: Serialize + TableDisplay>(
    items: &[T],
    format: OutputFormat,
) -> anyhow::Result<String> {
    if items.is_empty() {
        return Ok("No items found.".to_string());
    }

    let rendered = match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            table.to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(items)?,
        OutputFormat::Yaml => serde_yaml::to_string(items)?,
        OutputFormat::Plain => {
            let mut lines = Vec::new();
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    lines.push("---".to_string());
                }
                for (header, value) in T::headers().iter().zip(item.row()) {
                    lines.push(format!("{}: {}", header, value));
                }
            }
            lines.join("\n")
        }
    };

    Ok(rendered)
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(
    items: &[T],
    format: OutputFormat,
) -> anyhow::Result<()> {
    println!("{}", render_list(items, format)?);
    Ok(())
}

/// Serialize a configuration document; JSON when asked, YAML otherwise
pub fn render_document<T: Serialize + ?Sized>(
    document: &T,
    format: OutputFormat,
) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)?,
        _ => serde_yaml::to_string(document)?,
    })
}

/// Write a document to `output`, or print it when no path is given
pub fn emit_document<T: Serialize + ?Sized>(
    document: &T,
    output: Option<&Path>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            devhub_e2e_common::write_yaml(path, document)?;
            print_success(&format!("Wrote {}", path.display()));
        }
        None => print!("{}", render_document(document, format)?),
    }
    Ok(())
}

/// Print success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✅".green(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    eprintln!("{}  {}", "⚠️".yellow(), message);
}

/// Print info message
pub fn print_info(message: &str) {
    eprintln!("{}  {}", "ℹ️".blue(), message);
}
