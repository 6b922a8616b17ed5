//! Tag tables, taxonomies and filename correction for curated data directories.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod naming;

pub use error::{CurateError, Result};
