//! Fixture phases
//!
//! A [`Fixture`] runs the two phases of a database test. `prepare` resolves the
//! fixture directory, loads the selected scenarios and writes them with the
//! requested operation. `verify` loads the expectation data set the same way,
//! optionally applies an operation, then compares the data set with what the
//! database holds.

use std::path::PathBuf;
use std::sync::PoisonError;
use log::info;

use dbscenario_core::{
    DataSet, DataSetFactory, DirectoryResolver, FailureHandler, FixtureConfig, FixtureRequest,
    IgnoreColumns, Operation,
};

use crate::assertion::DatabaseAssertion;
use crate::database::Database;
use crate::error::{ClientError, Result};
use crate::executor::{ExecutionSummary, OperationExecutor};
use crate::registry::{DataSourceRegistry, SharedDatabase};

/// Runs prepare and verify phases against registered data sources
pub struct Fixture<'r> {
    config: FixtureConfig,
    factory: DataSetFactory,
    resolver: DirectoryResolver,
    ignore: IgnoreColumns,
    registry: &'r DataSourceRegistry,
}

impl Fixture<'static> {
    /// Create a fixture using the process-wide registry
    pub fn new(config: FixtureConfig) -> Result<Self> {
        Fixture::with_registry(config, DataSourceRegistry::global())
    }
}

impl<'r> Fixture<'r> {
    /// Create a fixture using `registry` to look up data sources
    pub fn with_registry(config: FixtureConfig, registry: &'r DataSourceRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Fixture {
            factory: config.factory()?,
            resolver: config.resolver()?,
            ignore: config.ignore()?,
            config,
            registry,
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Registry data sources are looked up in
    pub fn registry(&self) -> &'r DataSourceRegistry {
        self.registry
    }

    /// Fixture directory of a request
    pub fn resolve(&self, request: &FixtureRequest) -> Result<PathBuf> {
        let convention = request.convention_path();
        Ok(self.resolver.resolve(request.location(), convention.as_ref())?)
    }

    /// Resolve and load the data set of a request
    pub fn load(&self, request: &FixtureRequest) -> Result<DataSet> {
        let dir = self.resolve(request)?;
        let data_set = self
            .factory
            .load(&dir, request.scenarios(), request.schema())?
            .with_data_source(request.data_source().cloned());
        Ok(data_set)
    }

    /// Data source a request runs against: its own, else the configured default
    pub fn data_source(&self, request: &FixtureRequest) -> Result<SharedDatabase> {
        let name = match request.data_source() {
            Some(name) => name.clone(),
            None => self
                .config
                .default_data_source()?
                .ok_or(ClientError::NoDataSource)?,
        };
        self.registry
            .get(&name)
            .ok_or_else(|| ClientError::UnknownDataSource(name.to_string()))
    }

    /// Run the preparation phase on the request's data source
    pub fn prepare(&self, request: &FixtureRequest) -> Result<ExecutionSummary> {
        let shared = self.data_source(request)?;
        let mut db = shared.lock().unwrap_or_else(PoisonError::into_inner);
        self.prepare_on(&mut *db, request)
    }

    /// Run the preparation phase on `db`
    pub fn prepare_on(&self, db: &mut dyn Database, request: &FixtureRequest) -> Result<ExecutionSummary> {
        let data_set = self.load(request)?;
        let summary = OperationExecutor::new(db).execute(request.operation(), &data_set)?;
        info!(
            "Prepared scenarios {:?} with {}",
            request.scenarios(),
            request.operation()
        );
        Ok(summary)
    }

    /// Run the verification phase on the request's data source
    pub fn verify(&self, request: &FixtureRequest, handler: &mut dyn FailureHandler) -> Result<()> {
        let shared = self.data_source(request)?;
        let mut db = shared.lock().unwrap_or_else(PoisonError::into_inner);
        self.verify_on(&mut *db, request, handler)
    }

    /// Run the verification phase on `db`
    pub fn verify_on(
        &self,
        db: &mut dyn Database,
        request: &FixtureRequest,
        handler: &mut dyn FailureHandler,
    ) -> Result<()> {
        let expected = self.load(request)?;
        if request.operation() != Operation::None {
            OperationExecutor::new(db).execute(request.operation(), &expected)?;
        }

        let assertion = DatabaseAssertion::new(self.ignore.clone().merge(request.ignore()));
        assertion.assert_dataset(db, &expected, handler)?;
        info!("Verified scenarios {:?}", request.scenarios());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use dbscenario_core::{
        CollectingHandler, DataSourceName, FailFast, LoadError, MismatchKind, ScenarioName, TestIdentity,
    };

    use crate::database::SqliteDatabase;

    const SCHEMA: &str = "CREATE TABLE USERS (ID INTEGER PRIMARY KEY, NAME TEXT NOT NULL, CREATED_AT TEXT);";

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixtures() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        write(
            root.path(),
            "UserTest/findsAlice/USERS.csv",
            "[Scenario],ID,NAME\nfindsAlice,1,Alice\nfindsBob,2,Bob\n",
        );
        write(
            root.path(),
            "UserTest/findsAlice-expected/USERS.csv",
            "ID,NAME\n1,Alice\n",
        );
        root
    }

    fn config(root: &Path) -> FixtureConfig {
        let mut config = FixtureConfig::default();
        config.resource_root = root.to_path_buf();
        config.default_data_source = Some("main".to_string());
        config
    }

    fn registry() -> DataSourceRegistry {
        let registry = DataSourceRegistry::new();
        let mut db = SqliteDatabase::open_in_memory().unwrap();
        db.execute_batch(SCHEMA).unwrap();
        registry.register(DataSourceName::new("main").unwrap(), db);
        registry
    }

    fn identity() -> TestIdentity {
        TestIdentity::new("UserTest", "findsAlice")
    }

    #[test]
    fn test_prepare_then_verify_by_convention() {
        let root = fixtures();
        let registry = registry();
        let config = config(root.path());
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        let summary = fixture.prepare(&config.prepare_request(identity()).unwrap()).unwrap();
        assert_eq!(summary.total(), 1);

        let mut handler = CollectingHandler::new();
        fixture
            .verify(&config.verify_request(identity()).unwrap(), &mut handler)
            .unwrap();
        assert!(handler.finish().is_success());
    }

    #[test]
    fn test_verify_reports_unexpected_rows() {
        let root = fixtures();
        let registry = registry();
        let config = config(root.path());
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        let both = config
            .prepare_request(identity())
            .unwrap()
            .with_scenarios(vec![
                ScenarioName::new("findsAlice").unwrap(),
                ScenarioName::new("findsBob").unwrap(),
            ])
            .unwrap();
        fixture.prepare(&both).unwrap();

        let err = fixture
            .verify(&config.verify_request(identity()).unwrap(), &mut FailFast)
            .unwrap_err();
        match err {
            ClientError::Assertion(assertion) => {
                assert_eq!(assertion.mismatches[0].kind, MismatchKind::RowCount)
            }
            other => panic!("Expected an assertion error, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_location_wins_over_convention() {
        let root = fixtures();
        write(root.path(), "shared/USERS.csv", "ID,NAME\n7,Shared\n");
        let registry = registry();
        let config = config(root.path());
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        let request = config
            .prepare_request(identity())
            .unwrap()
            .with_location(Some("shared".to_string()));
        assert_eq!(fixture.resolve(&request).unwrap(), root.path().join("shared"));
        let data_set = fixture.load(&request).unwrap();
        assert_eq!(data_set.row_count(), 1);
    }

    #[test]
    fn test_missing_directory_lists_attempted_paths() {
        let root = fixtures();
        let registry = registry();
        let config = config(root.path());
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        let request = config
            .prepare_request(TestIdentity::new("OtherTest", "nothingHere"))
            .unwrap();
        match fixture.prepare(&request).unwrap_err() {
            ClientError::Load(LoadError::DirectoryNotFound { attempted }) => {
                assert_eq!(attempted.len(), 2)
            }
            other => panic!("Expected DirectoryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_data_source_lookup() {
        let root = fixtures();
        let registry = registry();
        let mut config = config(root.path());
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        let request = config
            .prepare_request(identity())
            .unwrap()
            .with_data_source(Some(DataSourceName::new("replica").unwrap()));
        assert!(matches!(
            fixture.prepare(&request),
            Err(ClientError::UnknownDataSource(name)) if name == "replica"
        ));

        config.default_data_source = None;
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();
        let request = config.prepare_request(identity()).unwrap();
        assert!(matches!(fixture.prepare(&request), Err(ClientError::NoDataSource)));
    }

    #[test]
    fn test_verify_with_ignored_column() {
        let root = fixtures();
        write(
            root.path(),
            "UserTest/stamped-expected/USERS.csv",
            "ID,NAME,CREATED_AT\n1,Alice,anything\n",
        );
        let registry = registry();
        let mut config = config(root.path());
        config.ignore_columns = vec!["CREATED_AT".to_string()];
        let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

        fixture.prepare(&config.prepare_request(identity()).unwrap()).unwrap();
        let request = config
            .verify_request(TestIdentity::new("UserTest", "stamped"))
            .unwrap()
            .with_scenarios(vec![ScenarioName::new("findsAlice").unwrap()])
            .unwrap();
        fixture.verify(&request, &mut FailFast).unwrap();
    }
}
