// Staging configuration
//
// Resolution order (later wins):
// 1. Built-in defaults
// 2. TOML file: --config, else STAGER_CONFIG, else ./stager.toml when present
// 3. Environment variables (STAGER_* prefix)
// 4. Command-line overrides

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::preflight::SqlSettings;
use crate::script::LoadTarget;
use crate::StagerError;

pub const ENV_PREFIX: &str = "STAGER_";
pub const DEFAULT_CONFIG_FILE: &str = "./stager.toml";

pub const DEFAULT_DTEXEC_PATH: &str =
    r"C:\Program Files\Microsoft SQL Server\130\DTS\Binn\DTExec.exe";

/// Everything a staging run needs. Deserialized from TOML; missing keys keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagingConfig {
    /// Directory holding the `*.zip` drops.
    pub source_root: PathBuf,
    /// Root under which each archive gets its own extraction folder.
    pub output_root: PathBuf,
    pub database: String,
    pub primary_server: String,
    /// Server hosting the SSIS catalog the package is deployed to.
    pub deployed_server: String,
    /// Package path (`\SSISDB\...`) or DJENGINE map file.
    pub template_path: String,
    /// Files per batch folder.
    pub batch_capacity: usize,
    /// Extraction workers; 0 means one per CPU.
    pub workers: usize,
    /// Date stamped into batch folder names; today when unset.
    pub batch_date: Option<NaiveDate>,
    /// Glob selecting the files a load script is written for.
    pub file_pattern: String,
    pub dtexec_path: String,
    pub sql_client: String,
    /// Database the table-provisioning procedure for text files lives in.
    pub control_database: String,
    pub sheet_name: String,
    pub skip_preflight: bool,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            output_root: PathBuf::new(),
            database: String::new(),
            primary_server: String::new(),
            deployed_server: String::new(),
            template_path: String::new(),
            batch_capacity: 4,
            workers: 0,
            batch_date: None,
            file_pattern: "*.txt".to_string(),
            dtexec_path: DEFAULT_DTEXEC_PATH.to_string(),
            sql_client: "sqlcmd.exe".to_string(),
            control_database: "Amazon".to_string(),
            sheet_name: "Statement".to_string(),
            skip_preflight: false,
        }
    }
}

/// Values given on the command line; `None` leaves the configured value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_root: Option<PathBuf>,
    pub output_root: Option<PathBuf>,
    pub database: Option<String>,
    pub primary_server: Option<String>,
    pub deployed_server: Option<String>,
    pub template_path: Option<String>,
    pub batch_capacity: Option<usize>,
    pub workers: Option<usize>,
    pub batch_date: Option<NaiveDate>,
    pub file_pattern: Option<String>,
    pub dtexec_path: Option<String>,
    pub sql_client: Option<String>,
    pub control_database: Option<String>,
    pub sheet_name: Option<String>,
    pub skip_preflight: bool,
}

/// Source of `STAGER_*` variables. Keys are passed without the prefix.
pub trait EnvSource {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
pub struct StdEnv;

impl EnvSource for StdEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}

/// Loads the configuration from file and process environment.
pub fn load(explicit: Option<&Path>) -> Result<StagingConfig, StagerError> {
    load_with(explicit, &StdEnv)
}

pub fn load_with(explicit: Option<&Path>, env: &dyn EnvSource) -> Result<StagingConfig, StagerError> {
    let mut config = match config_file_path(explicit, env) {
        Some(path) => StagingConfig::from_file(&path)?,
        None => StagingConfig::default(),
    };
    config.apply_env(env)?;
    Ok(config)
}

fn config_file_path(explicit: Option<&Path>, env: &dyn EnvSource) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = env.get("CONFIG") {
        return Some(PathBuf::from(path));
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    default.exists().then(|| default.to_path_buf())
}

fn parse_env<T: FromStr>(key: &str, raw: &str) -> Result<T, StagerError> {
    raw.trim().parse().map_err(|_| {
        StagerError::Config(format!("{}{} has an invalid value: '{}'", ENV_PREFIX, key, raw))
    })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, StagerError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(StagerError::Config(format!(
            "{}{} must be a boolean, got '{}'",
            ENV_PREFIX, key, raw
        ))),
    }
}

impl StagingConfig {
    pub fn from_file(path: &Path) -> Result<Self, StagerError> {
        let content = std::fs::read_to_string(path).map_err(StagerError::io(path))?;
        Self::from_toml(&content).map_err(|source| StagerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn apply_env(&mut self, env: &dyn EnvSource) -> Result<(), StagerError> {
        if let Some(v) = env.get("SOURCE_ROOT") {
            self.source_root = PathBuf::from(v);
        }
        if let Some(v) = env.get("OUTPUT_ROOT") {
            self.output_root = PathBuf::from(v);
        }
        if let Some(v) = env.get("DATABASE") {
            self.database = v;
        }
        if let Some(v) = env.get("PRIMARY_SERVER") {
            self.primary_server = v;
        }
        if let Some(v) = env.get("DEPLOYED_SERVER") {
            self.deployed_server = v;
        }
        if let Some(v) = env.get("TEMPLATE_PATH") {
            self.template_path = v;
        }
        if let Some(v) = env.get("BATCH_CAPACITY") {
            self.batch_capacity = parse_env("BATCH_CAPACITY", &v)?;
        }
        if let Some(v) = env.get("WORKERS") {
            self.workers = parse_env("WORKERS", &v)?;
        }
        if let Some(v) = env.get("BATCH_DATE") {
            self.batch_date = Some(parse_env("BATCH_DATE", &v)?);
        }
        if let Some(v) = env.get("FILE_PATTERN") {
            self.file_pattern = v;
        }
        if let Some(v) = env.get("DTEXEC_PATH") {
            self.dtexec_path = v;
        }
        if let Some(v) = env.get("SQL_CLIENT") {
            self.sql_client = v;
        }
        if let Some(v) = env.get("CONTROL_DATABASE") {
            self.control_database = v;
        }
        if let Some(v) = env.get("SHEET_NAME") {
            self.sheet_name = v;
        }
        if let Some(v) = env.get("SKIP_PREFLIGHT") {
            self.skip_preflight = parse_bool("SKIP_PREFLIGHT", &v)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, o: ConfigOverrides) {
        if let Some(v) = o.source_root {
            self.source_root = v;
        }
        if let Some(v) = o.output_root {
            self.output_root = v;
        }
        if let Some(v) = o.database {
            self.database = v;
        }
        if let Some(v) = o.primary_server {
            self.primary_server = v;
        }
        if let Some(v) = o.deployed_server {
            self.deployed_server = v;
        }
        if let Some(v) = o.template_path {
            self.template_path = v;
        }
        if let Some(v) = o.batch_capacity {
            self.batch_capacity = v;
        }
        if let Some(v) = o.workers {
            self.workers = v;
        }
        if let Some(v) = o.batch_date {
            self.batch_date = Some(v);
        }
        if let Some(v) = o.file_pattern {
            self.file_pattern = v;
        }
        if let Some(v) = o.dtexec_path {
            self.dtexec_path = v;
        }
        if let Some(v) = o.sql_client {
            self.sql_client = v;
        }
        if let Some(v) = o.control_database {
            self.control_database = v;
        }
        if let Some(v) = o.sheet_name {
            self.sheet_name = v;
        }
        self.skip_preflight |= o.skip_preflight;
    }

    /// Checks everything a full run needs.
    pub fn validate(&self) -> Result<(), StagerError> {
        self.validate_extract()?;
        self.validate_batching()?;
        self.validate_load_target()
    }

    pub fn validate_extract(&self) -> Result<(), StagerError> {
        require_path("source_root", &self.source_root)?;
        require_path("output_root", &self.output_root)
    }

    pub fn validate_batching(&self) -> Result<(), StagerError> {
        if self.batch_capacity == 0 {
            return Err(StagerError::Config(
                "batch_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_load_target(&self) -> Result<(), StagerError> {
        require("database", &self.database)?;
        require("primary_server", &self.primary_server)?;
        require("deployed_server", &self.deployed_server)?;
        require("template_path", &self.template_path)?;
        require("file_pattern", &self.file_pattern)?;
        if !self.skip_preflight {
            require("sql_client", &self.sql_client)?;
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    pub fn resolved_batch_date(&self) -> NaiveDate {
        self.batch_date.unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn load_target(&self) -> LoadTarget {
        LoadTarget {
            database: self.database.clone(),
            server: self.primary_server.clone(),
            deployed_server: self.deployed_server.clone(),
            template_path: self.template_path.clone(),
            dtexec_path: self.dtexec_path.clone(),
            sheet_name: self.sheet_name.clone(),
        }
    }

    pub fn sql_settings(&self) -> SqlSettings {
        SqlSettings {
            client: self.sql_client.clone(),
            control_database: self.control_database.clone(),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), StagerError> {
    if value.trim().is_empty() {
        return Err(StagerError::Config(format!("{} is required", field)));
    }
    Ok(())
}

fn require_path(field: &str, value: &Path) -> Result<(), StagerError> {
    if value.as_os_str().is_empty() {
        return Err(StagerError::Config(format!("{} is required", field)));
    }
    Ok(())
}
