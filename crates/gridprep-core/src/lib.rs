//! Core types and trait definitions for the Gridprep warehouse.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod customer;
pub mod error;
pub mod fixtures;
pub mod key;
pub mod location;
pub mod store;

pub use error::{Error, Result};
