use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use log::{debug, info};

use dbscenario_client::{snapshot, Database, Fixture, PostgresDatabase, SqliteDatabase};
use dbscenario_core::{
    CollectingHandler, FixtureConfig, FixtureRequest, IgnoreColumns, Operation, QualifiedTable,
    ScenarioName, SchemaName, TableName, TestIdentity,
};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Scenario-aware database fixtures")]
struct Args {
    /// Config file path
    #[clap(short, long, env = "DBSCENARIO_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory for relative and convention fixture locations
    #[clap(long, env = "DBSCENARIO_RESOURCE_ROOT")]
    resource_root: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load scenarios and write them to the database
    Seed {
        #[clap(flatten)]
        target: Target,

        #[clap(flatten)]
        database: DatabaseArgs,

        /// Write operation, e.g. CLEAN_INSERT or REFRESH
        #[clap(short, long)]
        operation: Option<Operation>,
    },

    /// Compare expected data with the database
    Verify {
        #[clap(flatten)]
        target: Target,

        #[clap(flatten)]
        database: DatabaseArgs,

        /// Operation applied before comparing
        #[clap(short, long)]
        operation: Option<Operation>,

        /// Extra columns to ignore, `COLUMN` or `TABLE.COLUMN`
        #[clap(long = "ignore")]
        ignore: Vec<String>,

        /// Print mismatches as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print the order tables of a fixture directory are written in
    Order {
        /// Fixture directory
        dir: PathBuf,

        /// Print the deletion order instead
        #[clap(long)]
        reverse: bool,
    },

    /// Print database tables as JSON
    Dump {
        #[clap(flatten)]
        database: DatabaseArgs,

        /// Tables to read, in output order
        #[clap(required = true)]
        tables: Vec<String>,

        /// Schema qualifying the tables
        #[clap(long)]
        schema: Option<SchemaName>,
    },
}

/// Which fixture data a phase works on
#[derive(ClapArgs, Debug)]
struct Target {
    /// Fixture location: a path, `file:` or `resource:` URI
    #[clap(short, long)]
    location: Option<String>,

    /// Suite of the test, used for convention locations
    #[clap(long)]
    suite: Option<String>,

    /// Test name, used for convention locations and as default scenario
    #[clap(long)]
    test: Option<String>,

    /// Scenario to select; may be repeated
    #[clap(short, long = "scenario")]
    scenarios: Vec<ScenarioName>,

    /// Schema qualifying the tables
    #[clap(long)]
    schema: Option<SchemaName>,
}

/// Database to connect to
#[derive(ClapArgs, Debug)]
struct DatabaseArgs {
    /// SQLite database file
    #[clap(long, env = "DBSCENARIO_SQLITE", conflicts_with = "postgres")]
    sqlite: Option<PathBuf>,

    /// PostgreSQL connection string
    #[clap(long, env = "DBSCENARIO_POSTGRES")]
    postgres: Option<String>,
}

impl DatabaseArgs {
    fn open(&self) -> Result<Box<dyn Database + Send>> {
        match (&self.sqlite, &self.postgres) {
            (Some(path), _) => {
                info!("Opening SQLite database {}", path.display());
                Ok(Box::new(SqliteDatabase::open(path)?))
            }
            (None, Some(connection)) => {
                info!("Connecting to PostgreSQL");
                Ok(Box::new(PostgresDatabase::connect(connection)?))
            }
            (None, None) => bail!("No database given; use --sqlite or --postgres"),
        }
    }
}

impl Target {
    fn request(&self, config: &FixtureConfig, verify: bool) -> Result<FixtureRequest> {
        let identity = match (&self.suite, &self.test) {
            (Some(suite), Some(test)) => Some(TestIdentity::new(suite, test)),
            (None, Some(test)) => Some(TestIdentity::new("", test)),
            (Some(_), None) => bail!("--suite needs --test"),
            (None, None) => None,
        };
        if identity.is_none() && self.location.is_none() {
            bail!("Give a fixture --location or a --test to resolve by convention");
        }

        let request = match (identity, verify) {
            (Some(identity), false) => config.prepare_request(identity)?,
            (Some(identity), true) => config.verify_request(identity)?,
            (None, _) => {
                let operation = if verify {
                    config.phases.verify_operation
                } else {
                    config.phases.prepare_operation
                };
                FixtureRequest::new(self.scenarios.clone())
                    .context("Give at least one --scenario or a --test")?
                    .with_operation(operation)
                    .with_ignore(config.ignore()?)
            }
        };

        let request = if self.scenarios.is_empty() {
            request
        } else {
            request.with_scenarios(self.scenarios.clone())?
        };
        Ok(request
            .with_location(self.location.clone())
            .with_schema(self.schema.clone()))
    }
}

fn load_config(args: &Args) -> Result<FixtureConfig> {
    let mut config = match &args.config {
        Some(path) => FixtureConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => FixtureConfig::new(),
    };
    if let Some(root) = &args.resource_root {
        config.resource_root = root.clone();
    }
    Ok(config)
}

fn seed(
    config: FixtureConfig,
    target: &Target,
    database: &DatabaseArgs,
    operation: Option<Operation>,
) -> Result<()> {
    let mut request = target.request(&config, false)?;
    if let Some(operation) = operation {
        request = request.with_operation(operation);
    }
    let mut db = database.open()?;
    let fixture = Fixture::new(config)?;

    let summary = fixture.prepare_on(&mut *db, &request)?;
    for (table, rows) in &summary.affected {
        println!("{}\t{}", table, rows);
    }
    info!("{} affected {} rows", summary.operation, summary.total());
    Ok(())
}

fn verify(
    config: FixtureConfig,
    target: &Target,
    database: &DatabaseArgs,
    operation: Option<Operation>,
    ignore: &[String],
    json: bool,
) -> Result<()> {
    let mut request = target.request(&config, true)?;
    if let Some(operation) = operation {
        request = request.with_operation(operation);
    }
    let extra = IgnoreColumns::parse(ignore)?;
    let request = {
        let merged = request.ignore().clone().merge(&extra);
        request.with_ignore(merged)
    };
    let mut db = database.open()?;
    let fixture = Fixture::new(config)?;

    let mut handler = CollectingHandler::new();
    fixture.verify_on(&mut *db, &request, &mut handler)?;
    let result = handler.finish();

    if json {
        println!("{}", serde_json::to_string_pretty(result.mismatches())?);
    } else {
        for mismatch in result.mismatches() {
            println!("{}", mismatch);
        }
    }
    if !result.is_success() {
        bail!("{} mismatch(es) found", result.mismatches().len());
    }
    info!("Database matches the expected data");
    Ok(())
}

fn order(config: &FixtureConfig, dir: &Path, reverse: bool) -> Result<Vec<TableName>> {
    let factory = config.factory()?;
    let available = factory
        .loadable_files(dir)?
        .iter()
        .filter_map(|path| path.file_stem())
        .map(|stem| TableName::new(stem.to_string_lossy()))
        .collect::<dbscenario_core::Result<Vec<_>>>()?;
    debug!("Found {} fixture tables in {}", available.len(), dir.display());

    let order = factory.ordering().resolve(dir, &available)?;
    Ok(if reverse {
        order.deletion()
    } else {
        order.insertion().to_vec()
    })
}

fn dump(database: &DatabaseArgs, tables: &[String], schema: Option<SchemaName>) -> Result<()> {
    let tables = tables
        .iter()
        .map(|name| -> Result<QualifiedTable> {
            Ok(QualifiedTable::new(schema.clone(), TableName::new(name)?))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut db = database.open()?;
    let data_set = snapshot(&mut *db, &tables)?;
    println!("{}", serde_json::to_string_pretty(&data_set)?);
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, &config.log_level),
    );

    match &args.command {
        Command::Seed {
            target,
            database,
            operation,
        } => seed(config, target, database, *operation),
        Command::Verify {
            target,
            database,
            operation,
            ignore,
            json,
        } => verify(config, target, database, *operation, ignore, *json),
        Command::Order { dir, reverse } => {
            for table in order(&config, dir, *reverse)? {
                println!("{}", table);
            }
            Ok(())
        }
        Command::Dump {
            database,
            tables,
            schema,
        } => dump(database, tables, schema.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_seed() {
        let args = parse(&[
            "dbscenario", "seed", "--location", "fixtures/users", "-s", "alice", "-s", "bob",
            "--sqlite", "test.db", "--operation", "REFRESH",
        ]);
        match args.command {
            Command::Seed {
                target,
                database,
                operation,
            } => {
                assert_eq!(target.scenarios.len(), 2);
                assert_eq!(database.sqlite, Some(PathBuf::from("test.db")));
                assert_eq!(operation, Some(Operation::Refresh));
            }
            other => panic!("Expected seed, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let result = Args::try_parse_from([
            "dbscenario", "seed", "--location", "x", "-s", "a", "--operation", "UPSERT",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_needs_location_or_test() {
        let config = FixtureConfig::default();
        let target = Target {
            location: None,
            suite: None,
            test: None,
            scenarios: vec![ScenarioName::new("a").unwrap()],
            schema: None,
        };
        assert!(target.request(&config, false).is_err());

        let target = Target {
            location: None,
            suite: Some("app::users".to_string()),
            test: Some("finds_alice".to_string()),
            scenarios: Vec::new(),
            schema: None,
        };
        let request = target.request(&config, true).unwrap();
        assert_eq!(request.scenarios(), &[ScenarioName::new("finds_alice").unwrap()]);
        assert_eq!(request.operation(), Operation::None);
        assert_eq!(request.suffix(), Some("-expected"));
    }

    #[test]
    fn test_seed_verify_and_order_on_sqlite_file() {
        let dir = tempfile::tempdir().unwrap();
        let fixtures = dir.path().join("fixtures");
        fs::create_dir_all(&fixtures).unwrap();
        fs::write(fixtures.join("USERS.csv"), "[Scenario],ID,NAME\n,1,Alice\nbob,2,Bob\n").unwrap();
        fs::write(fixtures.join("AUDIT.csv"), "ID\n1\n").unwrap();
        fs::write(fixtures.join("table-ordering.txt"), "USERS\n").unwrap();

        let path = dir.path().join("test.db");
        SqliteDatabase::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE USERS (ID INTEGER PRIMARY KEY, NAME TEXT);
                 CREATE TABLE AUDIT (ID INTEGER PRIMARY KEY);",
            )
            .unwrap();

        let target = Target {
            location: Some(fixtures.display().to_string()),
            suite: None,
            test: None,
            scenarios: vec![ScenarioName::new("bob").unwrap()],
            schema: None,
        };
        let database = DatabaseArgs {
            sqlite: Some(path),
            postgres: None,
        };

        seed(FixtureConfig::default(), &target, &database, None).unwrap();
        verify(FixtureConfig::default(), &target, &database, None, &[], false).unwrap();

        let other = Target {
            scenarios: vec![ScenarioName::new("carol").unwrap()],
            ..target
        };
        assert!(verify(FixtureConfig::default(), &other, &database, None, &[], true).is_err());

        let names: Vec<String> = order(&FixtureConfig::default(), &fixtures, false)
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(names, vec!["USERS", "AUDIT"]);
    }
}
