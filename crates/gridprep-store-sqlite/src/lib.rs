//! SQLite backend for the Gridprep warehouse.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. Each pipeline stage executes as a
//! single rusqlite transaction: either every statement commits or none do.

mod encode;
mod schema;
mod store;

pub mod error;
pub mod loader;

pub use error::{Error, Result};
pub use loader::{LoadReport, load_dir};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
