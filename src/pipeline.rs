//! End-to-end staging run: extract, split, provision, script.
//!
//! Only extraction runs in parallel. Everything after the extraction join
//! point is sequential, one folder and one batch at a time.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::common::FilePattern;
use crate::config::StagingConfig;
use crate::extract;
use crate::partition;
use crate::preflight::{self, PreflightReport, TableProvisioner};
use crate::script::{self, LoadTarget};
use crate::StagerError;

/// Counters for one run. Printed as JSON by `stager run --json`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub archives: usize,
    pub failed_archives: usize,
    pub extracted_folders: usize,
    pub batch_folders: usize,
    /// Folders whose split stopped on a move error.
    pub failed_splits: usize,
    pub scripts: usize,
    pub script_lines: usize,
    pub failed_scripts: usize,
    pub preflight: PreflightReport,
}

/// Everything the per-batch stage needs, resolved once per run.
pub struct BatchStage<'a> {
    pub target: LoadTarget,
    pub pattern: FilePattern,
    pub sql: preflight::SqlSettings,
    /// `None` skips table provisioning.
    pub provisioner: Option<&'a dyn TableProvisioner>,
}

impl<'a> BatchStage<'a> {
    pub fn from_config(
        config: &StagingConfig,
        provisioner: &'a dyn TableProvisioner,
    ) -> Result<Self, StagerError> {
        Ok(Self {
            target: config.load_target(),
            pattern: FilePattern::new(&config.file_pattern)?,
            sql: config.sql_settings(),
            provisioner: (!config.skip_preflight).then_some(provisioner),
        })
    }

    /// Provisions the tables for one batch folder, then writes its script.
    pub fn process(&self, folder: &Path, summary: &mut RunSummary) {
        if let Some(provisioner) = self.provisioner {
            if folder.is_dir() {
                match script::matching_files(folder, &self.pattern) {
                    Ok(files) => {
                        let steps = preflight::plan_preflight(&files, &self.target, &self.sql);
                        let report = preflight::run_preflight(&steps, provisioner);
                        if report.failed > 0 {
                            warn!(folder = %folder.display(), failed = report.failed, "table provisioning had failures");
                        }
                        summary.preflight.absorb(&report);
                    }
                    Err(e) => warn!(folder = %folder.display(), error = %e, "could not list files for provisioning"),
                }
            }
        }

        match script::generate_script(folder, &self.target, &self.pattern) {
            Ok(Some(generated)) => {
                info!(script = %generated.path.display(), lines = generated.lines, "load script written");
                summary.scripts += 1;
                summary.script_lines += generated.lines;
            }
            Ok(None) => {}
            Err(e) => {
                error!(folder = %folder.display(), error = %e, "could not write load script");
                summary.failed_scripts += 1;
            }
        }
    }
}

/// Runs the whole staging pipeline. Failures inside the run are logged and
/// counted in the summary; none of them abort it.
pub fn run(config: &StagingConfig, provisioner: &dyn TableProvisioner) -> RunSummary {
    let mut summary = RunSummary::default();

    let stage = match BatchStage::from_config(config, provisioner) {
        Ok(stage) => stage,
        Err(e) => {
            error!(error = %e, "invalid load settings");
            return summary;
        }
    };

    if let Err(e) = fs::create_dir_all(&config.output_root) {
        error!(folder = %config.output_root.display(), error = %e, "could not create output folder");
        return summary;
    }

    let extracted = extract::extract_archives(&config.source_root, &config.output_root, config.worker_count());
    summary.archives = extracted.len();
    summary.failed_archives = extracted.iter().filter(|x| !x.succeeded()).count();
    summary.extracted_folders = extracted.iter().filter(|x| x.destination.is_dir()).count();

    let date = config.resolved_batch_date();
    for archive in &extracted {
        let batches = match partition::split_into_batches(&archive.destination, config.batch_capacity, date) {
            Ok(batches) => batches,
            Err(e) => {
                error!(folder = %archive.destination.display(), error = %e, "splitting stopped");
                summary.failed_splits += 1;
                continue;
            }
        };
        summary.batch_folders += batches.len();

        for batch in &batches {
            stage.process(batch, &mut summary);
        }
    }

    info!(
        archives = summary.archives,
        failed_archives = summary.failed_archives,
        batch_folders = summary.batch_folders,
        scripts = summary.scripts,
        script_lines = summary.script_lines,
        preflight_failed = summary.preflight.failed,
        "staging run finished"
    );
    summary
}
