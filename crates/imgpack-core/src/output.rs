//! Writing emitted assets and their manifest to disk.
//!
//! The pipeline itself only hands buffers to a [`crate::host::BuildContext`].
//! Hosts without their own asset store use these helpers to materialize an
//! emission under an output directory.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::pipeline::Emission;
use crate::types::EmittedAsset;

/// Manifest serialization format, picked from the manifest's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ManifestFormat {
    /// `.jsonl` and `.ndjson` select JSON Lines; anything else is JSON.
    pub fn for_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "jsonl" | "ndjson" => Self::JsonLines,
            _ => Self::Json,
        }
    }
}

/// Write every asset of `emission` below `out_dir`.
///
/// Destination names use `/` separators and are joined segment by segment.
/// Returns the paths written, in destination order.
pub fn write_assets(out_dir: &Path, emission: &Emission) -> io::Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(emission.assets.len());
    for (name, asset) in &emission.assets {
        let target = asset_path(out_dir, name)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, asset.source())?;
        tracing::debug!("Wrote {} bytes to {:?}", asset.size(), target);
        written.push(target);
    }
    Ok(written)
}

/// Write the manifest for `entries` to `path`, picking the format from its
/// extension. `pretty` only affects the JSON format.
pub fn write_manifest(path: &Path, entries: &[EmittedAsset], pretty: bool) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = io::BufWriter::new(std::fs::File::create(path)?);
    write_entries(&mut writer, entries, ManifestFormat::for_path(path), pretty)?;
    writer.flush()
}

fn write_entries<W: Write>(
    writer: &mut W,
    entries: &[EmittedAsset],
    format: ManifestFormat,
    pretty: bool,
) -> io::Result<()> {
    match format {
        ManifestFormat::Json if pretty => {
            serde_json::to_writer_pretty(&mut *writer, entries).map_err(io::Error::other)?;
            writeln!(writer)
        }
        ManifestFormat::Json => {
            serde_json::to_writer(&mut *writer, entries).map_err(io::Error::other)?;
            writeln!(writer)
        }
        ManifestFormat::JsonLines => {
            for entry in entries {
                serde_json::to_writer(&mut *writer, entry).map_err(io::Error::other)?;
                writeln!(writer)?;
            }
            Ok(())
        }
    }
}

/// Map a destination name to a path under `out_dir`, refusing names that
/// would escape it.
fn asset_path(out_dir: &Path, name: &str) -> io::Result<PathBuf> {
    let mut path = out_dir.to_path_buf();
    for segment in name.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("asset name escapes output directory: {name}"),
                ))
            }
            s => path.push(s),
        }
    }
    Ok(path)
}
