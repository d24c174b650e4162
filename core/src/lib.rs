//! gamepack core - packaging pipeline for mini-game collections
//!
//! Takes a source tree holding independent game projects, copies every
//! game directory into a target tree, compiles the embedded game source
//! (if any) and writes a manifest describing the collection.
//!
//! # Architecture
//!
//! - [`discovery`] - find `*game*` directories at the top of a source root
//! - [`naming`] - derive the packaged name of a game directory
//! - [`copy`] - replace-then-copy a directory tree
//! - [`compile`] - run the external compiler for a single source file
//! - [`manifest`] - `metadata.json` writer
//! - [`report`] - per-game outcomes written to `report.json`
//! - [`pipeline`] - ties the steps together for one packaging run

pub mod compile;
pub mod config;
pub mod copy;
pub mod discovery;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod report;

pub use compile::{CompileFailure, CompileOutcome, Toolchain};
pub use config::{CopyFailurePolicy, PackConfig, DEFAULT_CONFIG_FILE};
pub use discovery::{GameEntry, discover_games};
pub use error::{PackError, Result};
pub use manifest::{GameManifest, write_manifest};
pub use pipeline::{PackRequest, run};
pub use report::{BuildReport, GameReport, REPORT_SCHEMA_VERSION, StepStatus};
