//! # eLearn Common Library
//!
//! Shared code for the eLearn course service including:
//! - Error taxonomy (`Error`, `Result`)
//! - Bootstrap configuration resolution
//! - Database initialization, schema, migrations and row models
//! - Week/session sequencing algorithms
//! - Progress aggregation
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod progress;
pub mod sequence;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use progress::{ProgressPolicy, ProgressSnapshot};
pub use sequence::{ReorderStrategy, Slot};
