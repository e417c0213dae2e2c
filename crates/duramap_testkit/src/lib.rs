//! # Duramap Testkit
//!
//! Test utilities for Duramap.
//!
//! This crate provides:
//! - Test fixtures for maps on disk or in memory
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use duramap_core::CoreError;
//! use duramap_testkit::prelude::*;
//!
//! let fixture = TestMap::file();
//! fixture
//!     .update(|tx| {
//!         tx.set("k", 1);
//!         Ok::<_, CoreError>(())
//!     })
//!     .unwrap();
//! assert_eq!(fixture.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
