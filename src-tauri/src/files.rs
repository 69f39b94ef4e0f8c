use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

/// Write bytes atomically: temp file in the target's directory, then rename.
/// An interrupted write never leaves a partial file behind.
pub fn write_atomic(target_path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Target path has no parent directory: {:?}", target_path))?;

    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {:?}", parent))?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.flush()?;
    temp.persist(target_path)
        .with_context(|| format!("Failed to move file into place at {:?}", target_path))?;

    info!("Wrote {} bytes to {:?}", bytes.len(), target_path);
    Ok(())
}

/// Where exports land: the user's Downloads folder, else `fallback`.
pub fn export_dir(fallback: &Path) -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| fallback.to_path_buf())
}
