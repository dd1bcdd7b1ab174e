//! Read/delete commands for media items and categories.

use super::print_json;
use anyhow::Result;
use proteus_core::transport::Transport;
use proteus_core::ProteusClient;

pub fn run_show<T: Transport>(client: &ProteusClient<T>, id: &str) -> Result<()> {
    print_json(&client.media_show(id)?)
}

pub fn run_index<T: Transport>(client: &ProteusClient<T>, query: &[(String, String)]) -> Result<()> {
    let pairs: Vec<(&str, &str)> = query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    print_json(&client.media_index(&pairs)?)
}

pub fn run_delete<T: Transport>(client: &ProteusClient<T>, id: &str) -> Result<()> {
    client.media_delete(id)?;
    println!("Deleted media {}.", id);
    Ok(())
}

pub fn run_categories<T: Transport>(client: &ProteusClient<T>) -> Result<()> {
    print_json(&client.categories_index()?)
}

pub fn run_preset<T: Transport>(client: &ProteusClient<T>, id: &str) -> Result<()> {
    print_json(&client.preset_by_media(id).unwrap_or(serde_json::Value::Null))
}
