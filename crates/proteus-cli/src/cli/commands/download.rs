//! `proteus download` – fetch an asset into a file (or stdout).

use anyhow::{Context, Result};
use proteus_core::client::store_into;
use proteus_core::download::AssetRef;
use proteus_core::filename::sanitize_filename;
use proteus_core::transport::Transport;
use proteus_core::ProteusClient;
use std::fs;
use std::io;
use std::path::Path;

pub fn run_download<T: Transport>(
    client: &ProteusClient<T>,
    id: &str,
    ext: Option<&str>,
    dir: &Path,
    to_stdout: bool,
) -> Result<()> {
    let asset = client.media_download(&AssetRef::new(id, ext))?;

    if to_stdout {
        let mut out = io::stdout().lock();
        let saved = store_into(asset, &mut out)?;
        tracing::info!("wrote {} bytes of {} to stdout", saved.bytes, id);
        return Ok(());
    }

    let name = sanitize_filename(asset.suggested_filename());
    let final_path = dir.join(&name);
    let part_path = dir.join(format!("{}.part", name));
    let mut file = fs::File::create(&part_path)
        .with_context(|| format!("create {}", part_path.display()))?;

    let saved = match store_into(asset, &mut file) {
        Ok(saved) => saved,
        Err(e) => {
            drop(file);
            let _ = fs::remove_file(&part_path);
            return Err(e.into());
        }
    };
    file.sync_all()?;
    drop(file);
    fs::rename(&part_path, &final_path)
        .with_context(|| format!("rename to {}", final_path.display()))?;

    tracing::info!(
        "saved {} ({} bytes, {}) to {}",
        id,
        saved.bytes,
        saved.content_type,
        final_path.display()
    );
    println!("{}  {}", saved.sha256, final_path.display());
    Ok(())
}
