//! Staging area for map updates.
//!
//! A [`Transaction`] is handed to the mutator of
//! [`Duramap::update`](crate::Duramap::update). Reads fall through to the
//! mirror, writes are buffered and only take effect if the mutator returns
//! `Ok` and the commit becomes durable.

mod state;

pub use state::{PendingWrite, Transaction};
