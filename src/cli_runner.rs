//! Dispatch for the `stager` binary.
//!
//! Errors returned from here happen before any staging work starts (bad
//! configuration, invalid pattern). Once a command runs, failures are logged
//! and the process still exits successfully.

use crate::cli::{self, Commands};
use crate::config::{self, ConfigOverrides};
use crate::pipeline::{self, BatchStage, RunSummary};
use crate::preflight::{DryRunProvisioner, SqlCmdProvisioner, TableProvisioner};
use crate::{extract, logging, partition};

use tracing::error;

fn provisioner_for(dry_run: bool) -> Box<dyn TableProvisioner> {
    if dry_run {
        Box::new(DryRunProvisioner)
    } else {
        Box::new(SqlCmdProvisioner)
    }
}

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::run();
    logging::init_tracing(args.log_level.as_deref(), args.log_format);

    let mut config = config::load(args.config.as_deref())?;

    match args.command {
        Commands::Run { settings, dry_run_sql, json } => {
            config.apply_overrides(settings.into_overrides());
            config.validate()?;

            let provisioner = provisioner_for(dry_run_sql);
            let summary = pipeline::run(&config, provisioner.as_ref());
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Commands::Extract { source, output, workers } => {
            config.apply_overrides(ConfigOverrides {
                source_root: source,
                output_root: output,
                workers,
                ..Default::default()
            });
            config.validate_extract()?;

            for dir in extract::extract_all(&config.source_root, &config.output_root, config.worker_count()) {
                println!("{}", dir.display());
            }
        }
        Commands::Split { folder, files_per_dir, batch_date } => {
            config.apply_overrides(ConfigOverrides {
                batch_capacity: files_per_dir,
                batch_date,
                ..Default::default()
            });
            config.validate_batching()?;

            match partition::split_into_batches(&folder, config.batch_capacity, config.resolved_batch_date()) {
                Ok(dirs) => {
                    for dir in dirs {
                        println!("{}", dir.display());
                    }
                }
                Err(e) => error!(folder = %folder.display(), error = %e, "splitting stopped"),
            }
        }
        Commands::Script { folder, target, pattern, dry_run_sql } => {
            let mut overrides = target.into_overrides();
            overrides.file_pattern = pattern;
            config.apply_overrides(overrides);
            config.validate_load_target()?;

            let provisioner = provisioner_for(dry_run_sql);
            let stage = BatchStage::from_config(&config, provisioner.as_ref())?;
            let mut summary = RunSummary::default();
            stage.process(&folder, &mut summary);
        }
    }

    Ok(())
}
