//! # Table Pre-flight
//!
//! Before a batch is scripted, each destination table is provisioned through a
//! stored procedure called with the SQL client (`sqlcmd`). Text files get
//! `create_InventoryTbl` in the control database and the call is executed.
//! Spreadsheet files get the `create_InventoryTbl_v2` command built and logged
//! only; the DJENGINE map creates those tables itself.
//!
//! Failures are reported and counted, never fatal: the load script is written
//! either way.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::script::{table_name, FileKind, LoadTarget};
use crate::StagerError;

/// SQL client settings for provisioning calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlSettings {
    /// Executable of the SQL client, e.g. `sqlcmd.exe`.
    pub client: String,
    pub control_database: String,
}

/// One invocation of the SQL client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlCommand {
    pub program: String,
    pub server: String,
    pub database: String,
    pub query: String,
}

impl SqlCommand {
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-S")
            .arg(&self.server)
            .arg("-d")
            .arg(&self.database)
            .arg("-Q")
            .arg(&self.query);
        cmd
    }
}

impl fmt::Display for SqlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -S {} -d {} -Q \"{}\"",
            self.program, self.server, self.database, self.query
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionStep {
    pub file: PathBuf,
    pub command: SqlCommand,
    /// `false` for commands that are only built and logged.
    pub execute: bool,
}

/// The provisioning command for one staged file.
pub fn provision_step(file: &Path, target: &LoadTarget, sql: &SqlSettings) -> ProvisionStep {
    let name = table_name(file);
    let (database, query, execute) = match FileKind::of(file) {
        FileKind::Spreadsheet => (
            target.database.clone(),
            format!("exec create_InventoryTbl_v2 '{}','{}'", target.database, name),
            false,
        ),
        FileKind::Delimited => (
            sql.control_database.clone(),
            format!("exec [create_InventoryTbl] '{}','{}'", target.database, name),
            true,
        ),
    };

    ProvisionStep {
        file: file.to_path_buf(),
        command: SqlCommand {
            program: sql.client.clone(),
            server: target.server.clone(),
            database,
            query,
        },
        execute,
    }
}

pub fn plan_preflight(files: &[PathBuf], target: &LoadTarget, sql: &SqlSettings) -> Vec<ProvisionStep> {
    files.iter().map(|f| provision_step(f, target, sql)).collect()
}

/// Runs provisioning commands. Implementations block until the call is done.
pub trait TableProvisioner {
    fn provision(&self, command: &SqlCommand) -> Result<(), StagerError>;
}

/// Runs the SQL client as a child process and waits for it.
pub struct SqlCmdProvisioner;

impl TableProvisioner for SqlCmdProvisioner {
    fn provision(&self, command: &SqlCommand) -> Result<(), StagerError> {
        let output = command.to_command().output().map_err(|e| StagerError::Preflight {
            command: command.to_string(),
            detail: format!("could not start SQL client: {}", e),
        })?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("exited with {}", output.status));
        Err(StagerError::Preflight {
            command: command.to_string(),
            detail,
        })
    }
}

/// Logs the commands instead of running them.
pub struct DryRunProvisioner;

impl TableProvisioner for DryRunProvisioner {
    fn provision(&self, command: &SqlCommand) -> Result<(), StagerError> {
        info!(command = %command, "dry run, not executing");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    pub executed: usize,
    /// Commands built but intentionally not run.
    pub skipped: usize,
    pub failed: usize,
}

impl PreflightReport {
    pub fn absorb(&mut self, other: &PreflightReport) {
        self.executed += other.executed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Executes the runnable steps in order. Failures are logged and counted.
pub fn run_preflight(steps: &[ProvisionStep], provisioner: &dyn TableProvisioner) -> PreflightReport {
    let mut report = PreflightReport::default();
    for step in steps {
        if !step.execute {
            debug!(file = %step.file.display(), command = %step.command, "provisioning command not executed");
            report.skipped += 1;
            continue;
        }
        match provisioner.provision(&step.command) {
            Ok(()) => {
                debug!(file = %step.file.display(), "table provisioned");
                report.executed += 1;
            }
            Err(e) => {
                warn!(file = %step.file.display(), error = %e, "error occurred creating table");
                report.failed += 1;
            }
        }
    }
    report
}
