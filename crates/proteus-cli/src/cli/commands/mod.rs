//! CLI command handlers, grouped by endpoint family.

mod download;
mod generate;
mod media;
mod metadata;
mod upload;

pub use download::run_download;
pub use generate::{run_completions, run_config_path, run_man};
pub use media::{run_categories, run_delete, run_index, run_preset, run_show};
pub use metadata::{run_metadata_keys, run_metadata_values, run_set_metadata};
pub use upload::run_upload;

use anyhow::Result;
use serde_json::Value;

/// clap value parser for `KEY=VALUE` arguments.
pub fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
