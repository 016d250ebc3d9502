use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ConfigOverrides;
use crate::logging::LogFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML configuration file. Defaults to $STAGER_CONFIG, then ./stager.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter directive (e.g. `debug`, `etl_stager=trace`). Defaults to $RUST_LOG, then `info`.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format.
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Extract every archive, split the files into batch folders and write the load scripts.
    #[command(alias = "r")]
    Run {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Log the table-provisioning commands instead of running the SQL client.
        #[arg(long)]
        dry_run_sql: bool,

        /// Print the run summary as JSON on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Extract the archives of the source folder, one folder per archive.
    #[command(alias = "x")]
    Extract {
        /// Folder holding the `*.zip` files.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Root folder for the extracted archives.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of extraction threads. [0 = one per CPU core]
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Move the files of a folder into dated batch folders.
    #[command(alias = "s")]
    Split {
        /// Folder whose files are split.
        #[arg(required = true)]
        folder: PathBuf,

        /// Maximum number of files per batch folder.
        #[arg(long)]
        files_per_dir: Option<usize>,

        /// Date used in batch folder names (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        batch_date: Option<NaiveDate>,
    },

    /// Write the load script for one batch folder.
    Script {
        /// Batch folder to script.
        #[arg(required = true)]
        folder: PathBuf,

        #[command(flatten)]
        target: LoadTargetArgs,

        /// Glob selecting the files to load. [default: *.txt]
        #[arg(long)]
        pattern: Option<String>,

        /// Log the table-provisioning commands instead of running the SQL client.
        #[arg(long)]
        dry_run_sql: bool,
    },
}

/// Command-line overrides for a full run.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct SettingsArgs {
    /// Folder holding the `*.zip` files.
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Root folder for the extracted archives.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum number of files per batch folder.
    #[arg(long)]
    pub files_per_dir: Option<usize>,

    /// Number of extraction threads. [0 = one per CPU core]
    #[arg(long)]
    pub workers: Option<usize>,

    /// Date used in batch folder names (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub batch_date: Option<NaiveDate>,

    #[command(flatten)]
    pub load: LoadTargetArgs,
}

impl SettingsArgs {
    pub fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            source_root: self.source,
            output_root: self.output,
            batch_capacity: self.files_per_dir,
            workers: self.workers,
            batch_date: self.batch_date,
            ..self.load.into_overrides()
        }
    }
}

/// Where the load lines point and how tables are provisioned.
#[derive(clap::Args, Clone, Debug, Default)]
pub struct LoadTargetArgs {
    /// Target database.
    #[arg(long)]
    pub database: Option<String>,

    /// SQL Server the data is loaded into.
    #[arg(long)]
    pub server: Option<String>,

    /// Server hosting the deployed SSIS package.
    #[arg(long)]
    pub deployed_server: Option<String>,

    /// SSIS package path or DJENGINE map file.
    #[arg(long)]
    pub template: Option<String>,

    /// Path to DTExec.exe written into the load lines.
    #[arg(long)]
    pub dtexec: Option<String>,

    /// Worksheet read from spreadsheet sources.
    #[arg(long)]
    pub sheet_name: Option<String>,

    /// SQL client executable used for table provisioning.
    #[arg(long)]
    pub sql_client: Option<String>,

    /// Database holding the table-provisioning procedure.
    #[arg(long)]
    pub control_database: Option<String>,

    /// Do not provision destination tables before scripting.
    #[arg(long)]
    pub skip_preflight: bool,
}

impl LoadTargetArgs {
    pub fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            database: self.database,
            primary_server: self.server,
            deployed_server: self.deployed_server,
            template_path: self.template,
            dtexec_path: self.dtexec,
            sheet_name: self.sheet_name,
            sql_client: self.sql_client,
            control_database: self.control_database,
            skip_preflight: self.skip_preflight,
            ..Default::default()
        }
    }
}

/// Parses command-line arguments using `clap`.
///
/// Invalid arguments print clap's usage message and exit the process.
pub fn run() -> Args {
    Args::parse()
}
