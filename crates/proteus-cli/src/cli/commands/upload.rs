//! `proteus upload` – multipart upload of files, fields and transformations.

use super::print_json;
use anyhow::Result;
use proteus_core::payload::{UploadFile, UploadInput, UploadValue, TRANSFORMATIONS_KEY};
use proteus_core::transport::Transport;
use proteus_core::ProteusClient;

/// Fields, then files grouped by key (first-seen order), then transformations.
pub fn build_upload_input(
    files: &[(String, String)],
    fields: &[(String, String)],
    transformations: &[(String, String)],
) -> UploadInput {
    let mut input: UploadInput = fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect();

    let mut grouped: Vec<(String, Vec<UploadValue>)> = Vec::new();
    for (key, path) in files {
        let file = UploadValue::File(UploadFile::from_path(path.as_str()));
        match grouped.iter_mut().find(|(k, _)| k == key) {
            Some((_, list)) => list.push(file),
            None => grouped.push((key.clone(), vec![file])),
        }
    }
    for (key, list) in grouped {
        input.insert(key, UploadValue::List(list));
    }

    if !transformations.is_empty() {
        input.insert(
            TRANSFORMATIONS_KEY,
            UploadValue::map(
                transformations
                    .iter()
                    .map(|(name, key)| (name.clone(), UploadValue::map([("key", key.as_str())]))),
            ),
        );
    }
    input
}

pub fn run_upload<T: Transport>(
    client: &ProteusClient<T>,
    endpoint: &str,
    files: &[(String, String)],
    fields: &[(String, String)],
    transformations: &[(String, String)],
) -> Result<()> {
    let input = build_upload_input(files, fields, transformations);
    tracing::info!("uploading {} entries to {}", input.len(), endpoint);
    print_json(&client.upload_file(endpoint, &input)?)
}
