//! # Duramap Storage
//!
//! Storage engine trait and implementations for Duramap.
//!
//! This crate provides the lowest-level storage abstraction for Duramap.
//! Engines are **opaque ordered byte stores** split into named buckets -
//! they do not interpret the keys or values they store.
//!
//! ## Design Principles
//!
//! - Engines are simple bucketed byte stores (scan, atomic batch, reset)
//! - No knowledge of values, record wrapping or encryption
//! - Must be `Send + Sync` for concurrent access
//! - Duramap owns all interpretation of the stored bytes
//!
//! ## Available Engines
//!
//! - [`InMemoryEngine`] - For testing and ephemeral storage
//! - [`SledEngine`] - For persistent storage on top of sled
//!
//! ## Example
//!
//! ```rust
//! use duramap_storage::{InMemoryEngine, StorageEngine, WriteBatch};
//!
//! let engine = InMemoryEngine::new();
//! engine.ensure_bucket("bucket").unwrap();
//!
//! let mut batch = WriteBatch::new();
//! batch.put(b"hello".to_vec(), b"world".to_vec());
//! engine.commit("bucket", batch).unwrap();
//!
//! assert_eq!(engine.scan("bucket").unwrap().count(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod file;
mod memory;

pub use engine::{BatchOp, Record, RecordCursor, StorageEngine, WriteBatch};
pub use error::{StorageError, StorageResult};
pub use file::{EngineOptions, SledEngine};
pub use memory::InMemoryEngine;
