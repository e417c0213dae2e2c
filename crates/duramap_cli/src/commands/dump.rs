//! Dump command implementation.

use super::Format;
use crate::error::{CliError, CliResult};
use crate::json::to_json;
use duramap_core::{Duramap, Value};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// Full contents of one map.
#[derive(Debug, Serialize)]
pub struct MapDump {
    /// Storage path.
    pub path: String,
    /// Map name.
    pub map: String,
    /// Whether the map's values are encrypted.
    pub encrypted: bool,
    /// Number of entries.
    pub entry_count: usize,
    /// Entries in key order.
    pub entries: BTreeMap<String, serde_json::Value>,
}

/// Writes every entry of `map` in key order.
pub fn run(map: &Duramap, format: Format, out: &mut impl Write) -> CliResult<()> {
    let entries: BTreeMap<String, Value> =
        map.with_map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect());

    match format {
        Format::Json => {
            let mut json = BTreeMap::new();
            for (key, value) in &entries {
                let converted = to_json(value).map_err(|message| CliError::Unrepresentable {
                    key: key.clone(),
                    message,
                })?;
                json.insert(key.clone(), converted);
            }
            let dump = MapDump {
                path: map.path().display().to_string(),
                map: map.name().to_string(),
                encrypted: map.is_encrypted(),
                entry_count: json.len(),
                entries: json,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&dump)?)?;
        }
        Format::Text => {
            writeln!(out, "Map: {} ({})", map.name(), map.path().display())?;
            writeln!(
                out,
                "Encrypted: {}",
                if map.is_encrypted() { "yes" } else { "no" }
            )?;
            writeln!(out, "Entries: {}", entries.len())?;
            for (key, value) in &entries {
                writeln!(out, "  {key} = {}", render(value))?;
            }
        }
    }
    Ok(())
}

/// Renders a value on one line, falling back to its debug form when JSON
/// cannot hold it.
pub fn render(value: &Value) -> String {
    match to_json(value) {
        Ok(json) => json.to_string(),
        Err(_) => format!("{value:?}"),
    }
}
