//! Commands that read or change single entries.

use crate::error::{CliError, CliResult};
use crate::json::{from_json, to_json};
use duramap_core::{CoreError, Duramap};
use std::io::Write;
use tracing::info;

/// Prints the value stored under `key` as pretty JSON.
pub fn get(map: &Duramap, key: &str, out: &mut impl Write) -> CliResult<()> {
    let value = map
        .get(key)
        .ok_or_else(|| CliError::NotFound(key.to_string()))?;
    let json = to_json(&value).map_err(|message| CliError::Unrepresentable {
        key: key.to_string(),
        message,
    })?;
    writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
    Ok(())
}

/// Stores the JSON document `raw` under `key`.
pub fn set(map: &Duramap, key: &str, raw: &str, out: &mut impl Write) -> CliResult<()> {
    let value = from_json(serde_json::from_str(raw)?);
    map.update(|tx| {
        tx.set(key, value);
        Ok::<_, CoreError>(())
    })?;
    info!(map = map.name(), key, "set entry");
    writeln!(out, "set `{key}`")?;
    Ok(())
}

/// Removes `key`, reporting whether it was present.
pub fn remove(map: &Duramap, key: &str, out: &mut impl Write) -> CliResult<()> {
    let existed = map.update(|tx| {
        let existed = tx.contains_key(key);
        if existed {
            tx.remove(key);
        }
        Ok::<_, CoreError>(existed)
    })?;

    if existed {
        info!(map = map.name(), key, "removed entry");
        writeln!(out, "removed `{key}`")?;
    } else {
        writeln!(out, "`{key}` not present")?;
    }
    Ok(())
}

/// Deletes every entry of the map.
pub fn truncate(map: &Duramap, out: &mut impl Write) -> CliResult<()> {
    let count = map.len();
    map.truncate()?;
    writeln!(out, "truncated `{}` ({count} entries removed)", map.name())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use duramap_core::{Registry, Value};

    fn output(f: impl FnOnce(&mut Vec<u8>) -> CliResult<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn set_then_get() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();

        output(|out| set(&map, "user", r#"{"name": "Alice", "age": 30}"#, out));
        assert_eq!(
            map.get("user").unwrap().get("age"),
            Some(&Value::Integer(30))
        );

        let text = output(|out| get(&map, "user", out));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["name"], "Alice");
    }

    #[test]
    fn get_missing_key() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            get(&map, "absent", &mut out),
            Err(CliError::NotFound(key)) if key == "absent"
        ));
    }

    #[test]
    fn set_rejects_invalid_json() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();

        let mut out = Vec::new();
        assert!(matches!(
            set(&map, "k", "{not json", &mut out),
            Err(CliError::Json(_))
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();
        output(|out| set(&map, "k", "1", out));

        assert_eq!(output(|out| remove(&map, "k", out)), "removed `k`\n");
        assert_eq!(output(|out| remove(&map, "k", out)), "`k` not present\n");
        assert!(map.is_empty());
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn truncate_logs_once() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();
        output(|out| set(&map, "a", "1", out));

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            output(|out| truncate(&map, out));
        });

        let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logged.matches("truncated map").count(), 1, "{logged}");
    }

    #[test]
    fn truncate_clears_map() {
        let registry = Registry::in_memory();
        let map = registry.open_loaded("/mem/edit", "m", None).unwrap();
        output(|out| set(&map, "a", "1", out));
        output(|out| set(&map, "b", "2", out));

        let text = output(|out| truncate(&map, out));
        assert!(text.contains("2 entries removed"));
        assert!(map.is_empty());
    }
}
