//! # Duramap Core
//!
//! A durable, concurrency-safe, in-process key-value map.
//!
//! Each [`Duramap`] is an in-memory mirror of one named bucket in an
//! embedded, crash-safe storage engine, with optional per-value encryption.
//!
//! This crate provides:
//! - [`Registry`] - one shared engine handle per path and one live map per
//!   `(path, name)`
//! - [`Duramap`] - load, transactional update, shared reads, truncate, close
//! - [`Transaction`] - read-through staging of writes for one update
//! - [`Cipher`] and [`SecretKey`] - XChaCha20-Poly1305 record encryption
//!
//! ## Example
//!
//! ```
//! use duramap_core::{CoreError, Registry, Value};
//!
//! let registry = Registry::in_memory();
//! let map = registry.open_loaded("app.db", "settings", None).unwrap();
//!
//! map.update(|tx| {
//!     tx.set("theme", "dark");
//!     tx.set("font_size", 14);
//!     Ok::<_, CoreError>(())
//! })
//! .unwrap();
//!
//! assert_eq!(map.get("theme"), Some(Value::from("dark")));
//! map.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod crypto;
mod error;
mod map;
mod record;
mod registry;
mod transaction;
mod types;

pub use config::Config;
pub use crypto::{Cipher, SecretKey};
pub use error::{CoreError, CoreResult};
pub use map::{Duramap, MirrorGuard};
pub use registry::{EngineOpener, EngineRegistry, Registry};
pub use transaction::{PendingWrite, Transaction};
pub use types::{MapId, Mirror};

pub use duramap_codec::Value;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
