//! # etl-stager Core Library
//!
//! Stages zip drops for loading into SQL Server: the archives are extracted,
//! their files are split into dated batch folders of bounded size, and each
//! batch folder gets a `DJ.bat` that loads its files with DJENGINE or a
//! deployed SSIS package.
//!
//! ## Key Modules
//!
//! - [`extract`]: Discovers archives and extracts them on a bounded worker pool.
//! - [`partition`]: Splits a folder's files into fixed-size batch folders.
//! - [`preflight`]: Provisions destination tables through the SQL client.
//! - [`script`]: Renders the per-file load lines and writes `DJ.bat`.
//! - [`pipeline`]: Runs the whole sequence and reports a [`pipeline::RunSummary`].
//! - [`config`]: Layered configuration (defaults, TOML, environment, CLI).
//!
//! ## Examples
//!
//! ```no_run
//! use etl_stager::{config::StagingConfig, pipeline, preflight::DryRunProvisioner};
//!
//! let config = StagingConfig {
//!     source_root: "/drops/2025-01-09".into(),
//!     output_root: "/staging/Extracted".into(),
//!     database: "Inventory_2023".into(),
//!     primary_server: "sql01".into(),
//!     deployed_server: "ssis01".into(),
//!     template_path: r"\SSISDB\Inventory\Load.dtsx".into(),
//!     ..Default::default()
//! };
//! let summary = pipeline::run(&config, &DryRunProvisioner);
//! println!("{} scripts written", summary.scripts);
//! ```

pub mod cli;
pub mod cli_runner;
pub mod common;
pub mod config;

pub mod error;
pub use error::StagerError;

pub mod extract;
pub mod logging;
pub mod partition;
pub mod pipeline;
pub mod preflight;
pub mod script;

// Cross-platform filesystem helpers
pub mod fsx;
