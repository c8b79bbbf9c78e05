//! Database module: row models and SQL repositories for the record store.
//!
//! This module is split into two submodules:
//! - `model`: raw row shapes and their conversion into domain entities.
//! - `repo`: SQL-only functions over the `records` and `dispatch_lease` tables.
//!
//! External modules should import from `form_batcher::db`; the repository API
//! is re-exported here.

pub mod model;
pub mod repo;

pub use repo::*;

pub use model::{RecordRow, StatusCounts};
