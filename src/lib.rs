//! Grade aggregation and grading-scale conversion engine, plus the sidecar
//! IPC surface that exposes it.

pub mod calc;
pub mod config;
pub mod convert;
pub mod db;
pub mod ipc;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod scale;
pub mod stats;
pub mod store;
