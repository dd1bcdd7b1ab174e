//! CLI for the Proteus media service.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use proteus_core::{config, ProteusClient};
use std::path::PathBuf;

use commands::{
    parse_key_value, run_categories, run_completions, run_config_path, run_delete, run_download,
    run_index, run_man, run_metadata_keys, run_metadata_values, run_preset, run_set_metadata,
    run_show, run_upload,
};

/// Top-level CLI for the Proteus media service.
#[derive(Debug, Parser)]
#[command(name = "proteus")]
#[command(about = "Proteus: media service client", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a media asset, waiting while the service still processes it.
    Download {
        /// Media identifier.
        id: String,
        /// Requested output format (e.g. mp3). Omit for the original.
        #[arg(long)]
        ext: Option<String>,
        /// Directory to save into (default: current directory).
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// Write the bytes to stdout instead of a file.
        #[arg(long, conflicts_with = "output_dir")]
        stdout: bool,
    },

    /// Show one media item.
    Show { id: String },

    /// List media, optionally filtered.
    Index {
        /// Query parameter, repeatable.
        #[arg(long = "query", short = 'q', value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },

    /// Delete a media item.
    Delete { id: String },

    /// List categories.
    Categories,

    /// List metadata keys under a parent key.
    MetadataKeys { key: String },

    /// List known values of a metadata key.
    MetadataValues { key: String },

    /// Show the preset of a media item (prints null when unavailable).
    Preset { id: String },

    /// Upload files with fields and transformations as multipart/form-data.
    Upload {
        /// Endpoint relative to the service URL.
        #[arg(long, default_value = "media/store")]
        endpoint: String,
        /// File to attach as KEY=PATH, repeatable. Repeating a key sends several files.
        #[arg(long = "file", short = 'f', value_name = "KEY=PATH", value_parser = parse_key_value)]
        files: Vec<(String, String)>,
        /// Plain form field, repeatable.
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
        /// Requested transformation as NAME=KEY, repeatable.
        #[arg(long = "transformation", short = 't', value_name = "NAME=KEY", value_parser = parse_key_value)]
        transformations: Vec<(String, String)>,
    },

    /// Replace metadata of a media item.
    SetMetadata {
        id: String,
        /// Metadata entry sent as metadata[KEY], repeatable.
        #[arg(long = "meta", short = 'm', value_name = "KEY=VALUE", value_parser = parse_key_value)]
        meta: Vec<(String, String)>,
        /// Plain form field, repeatable.
        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// Print the config file path.
    ConfigPath,

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate the man page.
    Man,
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        // These work without a configured service.
        match &cli.command {
            CliCommand::ConfigPath => return run_config_path(),
            CliCommand::Completions { shell } => return run_completions(*shell),
            CliCommand::Man => return run_man(),
            _ => {}
        }

        let cfg = config::load_or_init()?.with_env_overrides();
        tracing::debug!("loaded config for {}", cfg.url);
        let client = ProteusClient::from_config(&cfg)?;

        match cli.command {
            CliCommand::Download {
                id,
                ext,
                output_dir,
                stdout,
            } => {
                let dir = match output_dir {
                    Some(d) => d,
                    None => std::env::current_dir()?,
                };
                run_download(&client, &id, ext.as_deref(), &dir, stdout)?
            }
            CliCommand::Show { id } => run_show(&client, &id)?,
            CliCommand::Index { query } => run_index(&client, &query)?,
            CliCommand::Delete { id } => run_delete(&client, &id)?,
            CliCommand::Categories => run_categories(&client)?,
            CliCommand::MetadataKeys { key } => run_metadata_keys(&client, &key)?,
            CliCommand::MetadataValues { key } => run_metadata_values(&client, &key)?,
            CliCommand::Preset { id } => run_preset(&client, &id)?,
            CliCommand::Upload {
                endpoint,
                files,
                fields,
                transformations,
            } => run_upload(&client, &endpoint, &files, &fields, &transformations)?,
            CliCommand::SetMetadata { id, meta, fields } => {
                run_set_metadata(&client, &id, &meta, &fields)?
            }
            CliCommand::ConfigPath | CliCommand::Completions { .. } | CliCommand::Man => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
