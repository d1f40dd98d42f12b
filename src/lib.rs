//! dashsync - Dashboard Data Sync Library
//!
//! This library provides the data layer behind a small dashboard: two
//! collections (sheet links and tasks) kept in a local store and mirrored
//! to a lightweight HTTP API whenever it is reachable.
//!
//! # Core Concepts
//!
//! - **Synchronizer**: session state plus the load and mutation pipelines
//! - **Source chain**: remote, then local, then built-in defaults; the first
//!   non-empty source wins, per collection
//! - **Local authority**: mutations apply locally first; the remote push is
//!   best effort and never rolled back
//! - **API service**: in-memory collections replaced wholesale on update
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `dashsync.toml` and the environment
//! - `error`: Error types and result aliases
//! - `model`: Records, ids, normalization and input types
//! - `defaults`: Built-in seed dataset
//! - `remote`: HTTP client for the dashboard API
//! - `local`: Key/value persistence of collections
//! - `lock`: File locking and atomic writes for the local store
//! - `source`: Ordered data-source fallback
//! - `sync`: The synchronizer
//! - `view`: Filtering and dashboard statistics
//! - `server`: The dashboard API service
//! - `output`: JSON envelope and human output for commands

pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod local;
pub mod lock;
pub mod model;
pub mod output;
pub mod remote;
pub mod server;
pub mod source;
pub mod sync;
pub mod view;

pub use error::{Error, Result};
pub use sync::Synchronizer;
