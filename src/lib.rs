//! Form submission store with periodic batch dispatch to a remote processing API.

pub mod api;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod intake;
pub mod model;
pub mod processor;
pub mod reconcile;
pub mod retry;
pub mod schedule;
pub mod selector;
