//! Configuration for fixture phases
//!
//! This module provides the plain values fixture phases are driven by: the
//! scenario marker column, file handling settings, the default operations of
//! the preparation and verification phases, and where fixtures live.

use std::fs::File;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::compare::IgnoreColumns;
use crate::error::{to_config_error, CoreError, Result};
use crate::factory::{DataSetFactory, DEFAULT_BINARY_PREFIX};
use crate::models::{DataSourceName, Operation, ScenarioMarker, DEFAULT_SCENARIO_MARKER};
use crate::ordering::{TableOrdering, DEFAULT_ORDERING_FILE};
use crate::reader::ReaderRegistry;
use crate::request::FixtureRequest;
use crate::resolver::{DirectoryResolver, TestIdentity};

/// Default suffix of directories holding expected data
pub const DEFAULT_EXPECTED_SUFFIX: &str = "-expected";

/// Fixture file handling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Header of the scenario marker column
    pub scenario_marker: String,

    /// Name of the table ordering file
    pub ordering_file: String,

    /// Prefix of base64-encoded binary cells; empty disables decoding
    pub binary_prefix: String,

    /// CSV field delimiter
    pub csv_delimiter: char,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        LoaderConfig {
            scenario_marker: DEFAULT_SCENARIO_MARKER.to_string(),
            ordering_file: DEFAULT_ORDERING_FILE.to_string(),
            binary_prefix: DEFAULT_BINARY_PREFIX.to_string(),
            csv_delimiter: ',',
        }
    }
}

/// Defaults of the preparation and verification phases
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Operation applied before a test
    pub prepare_operation: Operation,

    /// Operation applied before comparing expected data
    pub verify_operation: Operation,

    /// Suffix appended to convention paths of expected data
    pub expected_suffix: String,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        PhaseConfig {
            prepare_operation: Operation::CleanInsert,
            verify_operation: Operation::None,
            expected_suffix: DEFAULT_EXPECTED_SUFFIX.to_string(),
        }
    }
}

/// Fixture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
    /// File handling
    pub loader: LoaderConfig,

    /// Phase defaults
    pub phases: PhaseConfig,

    /// Root of resource and convention paths
    pub resource_root: PathBuf,

    /// Data source used when a request names none
    pub default_data_source: Option<String>,

    /// Columns never compared, as `COLUMN` or `TABLE.COLUMN`
    pub ignore_columns: Vec<String>,

    /// Log level
    pub log_level: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        FixtureConfig {
            loader: LoaderConfig::default(),
            phases: PhaseConfig::default(),
            resource_root: PathBuf::from("fixtures"),
            default_data_source: None,
            ignore_columns: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

impl FixtureConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let config: FixtureConfig = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Create a development configuration
    pub fn development() -> Self {
        let mut config = Self::default();
        config.log_level = "debug".to_string();
        config
    }

    /// Create a configuration for fixtures kept next to integration tests
    pub fn testing() -> Self {
        let mut config = Self::default();
        config.resource_root = PathBuf::from("tests").join("fixtures");
        config.log_level = "debug".to_string();
        config
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        self.scenario_marker()?;
        self.csv_delimiter()?;
        self.ignore()?;
        self.default_data_source()?;
        if self.loader.ordering_file.trim().is_empty() {
            return Err(CoreError::ConfigError("ordering file name is blank".to_string()));
        }
        Ok(())
    }

    /// Scenario marker column header
    pub fn scenario_marker(&self) -> Result<ScenarioMarker> {
        ScenarioMarker::new(&self.loader.scenario_marker).map_err(to_config_error)
    }

    /// CSV delimiter as a byte
    pub fn csv_delimiter(&self) -> Result<u8> {
        let delimiter = self.loader.csv_delimiter;
        if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
            return Err(CoreError::ConfigError(format!(
                "unusable CSV delimiter {:?}",
                delimiter
            )));
        }
        Ok(delimiter as u8)
    }

    /// Ignore columns
    pub fn ignore(&self) -> Result<IgnoreColumns> {
        IgnoreColumns::parse(&self.ignore_columns).map_err(to_config_error)
    }

    /// Default data source
    pub fn default_data_source(&self) -> Result<Option<DataSourceName>> {
        self.default_data_source
            .as_deref()
            .map(DataSourceName::new)
            .transpose()
            .map_err(to_config_error)
    }

    /// Reader registry honouring the CSV delimiter
    pub fn readers(&self) -> Result<ReaderRegistry> {
        Ok(ReaderRegistry::with_csv_delimiter(self.csv_delimiter()?))
    }

    /// Data set factory configured from the loader settings
    pub fn factory(&self) -> Result<DataSetFactory> {
        Ok(DataSetFactory::new(self.readers()?)
            .with_marker(self.scenario_marker()?)
            .with_ordering(TableOrdering::new(self.loader.ordering_file.trim()))
            .with_binary_prefix(self.loader.binary_prefix.clone()))
    }

    /// Directory resolver rooted at the resource root
    pub fn resolver(&self) -> Result<DirectoryResolver> {
        Ok(DirectoryResolver::new(&self.resource_root, self.readers()?))
    }

    /// Preparation request for a test, using the phase defaults
    pub fn prepare_request(&self, identity: TestIdentity) -> Result<FixtureRequest> {
        Ok(FixtureRequest::for_test(identity)?
            .with_operation(self.phases.prepare_operation)
            .with_data_source(self.default_data_source()?)
            .with_ignore(self.ignore()?))
    }

    /// Verification request for a test, using the phase defaults
    pub fn verify_request(&self, identity: TestIdentity) -> Result<FixtureRequest> {
        Ok(self
            .prepare_request(identity)?
            .with_operation(self.phases.verify_operation)
            .with_suffix(Some(self.phases.expected_suffix.clone())))
    }
}
