//! CLI command implementations.

pub mod buckets;
pub mod dump;
pub mod edit;

use crate::error::{CliError, CliResult};
use duramap_core::SecretKey;
use std::str::FromStr;

/// Output format of the reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Human-readable lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown format `{other}` (expected text or json)")),
        }
    }
}

/// Builds the map secret from the key arguments.
///
/// `--key-hex` takes a raw 32-byte key; `--password` with `--salt` derives
/// one. Without either the map is opened unencrypted.
pub fn secret_from_args(
    key_hex: Option<&str>,
    password: Option<&str>,
    salt: Option<&str>,
) -> CliResult<Option<SecretKey>> {
    match (key_hex, password, salt) {
        (Some(_), Some(_), _) => Err(CliError::usage(
            "--key-hex and --password cannot be used together",
        )),
        (Some(hex_key), None, _) => {
            let bytes = hex::decode(hex_key.trim())
                .map_err(|e| CliError::usage(format!("--key-hex is not valid hex: {e}")))?;
            Ok(Some(SecretKey::from_bytes(&bytes)?))
        }
        (None, Some(password), Some(salt)) => Ok(Some(SecretKey::derive_from_password(
            password.as_bytes(),
            salt.as_bytes(),
        )?)),
        (None, Some(_), None) => Err(CliError::usage("--password requires --salt")),
        (None, None, _) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_parses() {
        assert_eq!("text".parse::<Format>().unwrap(), Format::Text);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert!("yaml".parse::<Format>().is_err());
    }

    #[test]
    fn no_key_arguments_means_plain_map() {
        assert!(secret_from_args(None, None, None).unwrap().is_none());
    }

    #[test]
    fn hex_key_is_decoded() {
        let hex_key = "ab".repeat(32);
        let key = secret_from_args(Some(&hex_key), None, None)
            .unwrap()
            .unwrap();
        assert_eq!(key.as_bytes(), &[0xab; 32]);
    }

    #[test]
    fn bad_hex_key_is_rejected() {
        assert!(matches!(
            secret_from_args(Some("zz"), None, None),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            secret_from_args(Some("abcd"), None, None),
            Err(CliError::Core(_))
        ));
    }

    #[test]
    fn password_needs_salt() {
        assert!(matches!(
            secret_from_args(None, Some("pw"), None),
            Err(CliError::Usage(_))
        ));

        let a = secret_from_args(None, Some("pw"), Some("salt")).unwrap().unwrap();
        let b = secret_from_args(None, Some("pw"), Some("salt")).unwrap().unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
