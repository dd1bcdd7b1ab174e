//! Metadata listing and updates.

use super::print_json;
use anyhow::Result;
use proteus_core::payload::{UploadInput, UploadValue, METADATA_KEY};
use proteus_core::transport::Transport;
use proteus_core::ProteusClient;

pub fn run_metadata_keys<T: Transport>(client: &ProteusClient<T>, key: &str) -> Result<()> {
    print_json(&client.metadata_keys(key)?)
}

pub fn run_metadata_values<T: Transport>(client: &ProteusClient<T>, key: &str) -> Result<()> {
    print_json(&client.metadata_values(key)?)
}

/// Plain fields first, then the `metadata` map.
pub fn build_metadata_input(meta: &[(String, String)], fields: &[(String, String)]) -> UploadInput {
    let mut input: UploadInput = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    if !meta.is_empty() {
        input.insert(
            METADATA_KEY,
            UploadValue::map(meta.iter().map(|(k, v)| (k.clone(), v.clone()))),
        );
    }
    input
}

pub fn run_set_metadata<T: Transport>(
    client: &ProteusClient<T>,
    id: &str,
    meta: &[(String, String)],
    fields: &[(String, String)],
) -> Result<()> {
    let input = build_metadata_input(meta, fields);
    print_json(&client.media_update(id, &input)?)
}
