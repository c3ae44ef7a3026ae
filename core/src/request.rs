//! Resolved fixture requests
//!
//! A request is the fully resolved description of one fixture phase: where the
//! data lives, which scenarios to select, which operation to apply and against
//! which data source. How the values were chosen is up to the caller.

use serde::{Deserialize, Serialize};

use crate::compare::IgnoreColumns;
use crate::error::{to_request_error, CoreError, Result};
use crate::models::{DataSourceName, Operation, ScenarioName, SchemaName};
use crate::resolver::{ConventionPath, TestIdentity};

/// One fixture phase, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RequestRecord")]
pub struct FixtureRequest {
    location: Option<String>,
    suffix: Option<String>,
    scenarios: Vec<ScenarioName>,
    operation: Operation,
    data_source: Option<DataSourceName>,
    schema: Option<SchemaName>,
    identity: Option<TestIdentity>,
    #[serde(default)]
    ignore: IgnoreColumns,
}

#[derive(Deserialize)]
struct RequestRecord {
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    scenarios: Vec<ScenarioName>,
    #[serde(default)]
    operation: Operation,
    #[serde(default)]
    data_source: Option<DataSourceName>,
    #[serde(default)]
    schema: Option<SchemaName>,
    #[serde(default)]
    identity: Option<TestIdentity>,
    #[serde(default)]
    ignore: IgnoreColumns,
}

impl TryFrom<RequestRecord> for FixtureRequest {
    type Error = CoreError;

    fn try_from(record: RequestRecord) -> Result<Self> {
        let mut request = FixtureRequest::new(record.scenarios)?
            .with_location(record.location)
            .with_suffix(record.suffix)
            .with_operation(record.operation)
            .with_data_source(record.data_source)
            .with_schema(record.schema);
        request.identity = record.identity;
        request.ignore = record.ignore;
        Ok(request)
    }
}

impl FixtureRequest {
    /// Request for explicit scenarios; fails when none are given
    pub fn new(scenarios: Vec<ScenarioName>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(CoreError::InvalidRequest(
                "at least one scenario name is required".to_string(),
            ));
        }
        Ok(FixtureRequest {
            location: None,
            suffix: None,
            scenarios,
            operation: Operation::default(),
            data_source: None,
            schema: None,
            identity: None,
            ignore: IgnoreColumns::none(),
        })
    }

    /// Request for a test, selecting the scenario named after the test
    pub fn for_test(identity: TestIdentity) -> Result<Self> {
        let scenario = ScenarioName::new(&identity.name).map_err(to_request_error)?;
        let mut request = Self::new(vec![scenario])?;
        request.identity = Some(identity);
        Ok(request)
    }

    /// Use an explicit location instead of the convention path
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.location = location.filter(|l| !l.trim().is_empty());
        self
    }

    /// Suffix of the convention path
    pub fn with_suffix(mut self, suffix: Option<String>) -> Self {
        self.suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// Replace the scenarios; fails when none are given
    pub fn with_scenarios(mut self, scenarios: Vec<ScenarioName>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(CoreError::InvalidRequest(
                "at least one scenario name is required".to_string(),
            ));
        }
        self.scenarios = scenarios;
        Ok(self)
    }

    /// Operation to apply
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    /// Data source to run against
    pub fn with_data_source(mut self, data_source: Option<DataSourceName>) -> Self {
        self.data_source = data_source;
        self
    }

    /// Schema qualifying every table
    pub fn with_schema(mut self, schema: Option<SchemaName>) -> Self {
        self.schema = schema;
        self
    }

    /// Identity used for convention paths
    pub fn with_identity(mut self, identity: Option<TestIdentity>) -> Self {
        self.identity = identity;
        self
    }

    /// Columns excluded from verification
    pub fn with_ignore(mut self, ignore: IgnoreColumns) -> Self {
        self.ignore = ignore;
        self
    }

    /// Explicit location
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Convention path suffix
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Requested scenarios, never empty
    pub fn scenarios(&self) -> &[ScenarioName] {
        &self.scenarios
    }

    /// Operation to apply
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Data source to run against
    pub fn data_source(&self) -> Option<&DataSourceName> {
        self.data_source.as_ref()
    }

    /// Schema qualifying every table
    pub fn schema(&self) -> Option<&SchemaName> {
        self.schema.as_ref()
    }

    /// Test identity
    pub fn identity(&self) -> Option<&TestIdentity> {
        self.identity.as_ref()
    }

    /// Columns excluded from verification
    pub fn ignore(&self) -> &IgnoreColumns {
        &self.ignore
    }

    /// Convention path for the test identity, with the suffix applied
    pub fn convention_path(&self) -> Option<ConventionPath> {
        self.identity
            .clone()
            .map(|identity| ConventionPath::new(identity).with_suffix(self.suffix.clone()))
    }
}
