//! Buckets command implementation.

use super::Format;
use crate::error::CliResult;
use duramap_core::Registry;
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Map names stored at one path.
#[derive(Debug, Serialize)]
pub struct BucketList {
    /// Storage path.
    pub path: String,
    /// Stored map names, sorted.
    pub buckets: Vec<String>,
}

/// Lists the maps stored at `path`.
pub fn run(registry: &Registry, path: &Path, format: Format, out: &mut impl Write) -> CliResult<()> {
    let engine = registry.engines().acquire(path)?;
    let listed = engine.buckets();
    registry.engines().release(path)?;

    let mut buckets = listed?;
    buckets.sort();

    let list = BucketList {
        path: path.display().to_string(),
        buckets,
    };

    match format {
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(&list)?)?,
        Format::Text => {
            writeln!(out, "Maps at {}: {}", list.path, list.buckets.len())?;
            for name in &list.buckets {
                writeln!(out, "  {name}")?;
            }
        }
    }
    Ok(())
}
