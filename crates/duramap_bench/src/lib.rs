//! Shared helpers for the Duramap benchmarks.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
