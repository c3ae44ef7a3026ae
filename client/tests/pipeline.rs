//! End-to-end fixture runs against SQLite

use std::fs;
use std::path::Path;

use dbscenario_client::{
    ClientError, DataSourceRegistry, Database, Fixture, OperationExecutor, SqliteDatabase,
};
use dbscenario_core::{
    CollectingHandler, ComparisonEngine, DataSourceName, FailFast, FixtureConfig, FixtureRequest,
    MismatchKind, Operation, ScenarioName, TestIdentity,
};

const SCHEMA: &str = "
    CREATE TABLE ORDERS (ID INTEGER PRIMARY KEY AUTOINCREMENT, CUSTOMER TEXT NOT NULL, TOTAL NUMERIC);
    CREATE TABLE ITEMS (
        ID INTEGER PRIMARY KEY,
        ORDER_ID INTEGER NOT NULL REFERENCES ORDERS(ID),
        SKU TEXT NOT NULL,
        QTY INTEGER
    );
";

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// ITEMS sorts before ORDERS alphabetically; the ordering file puts ORDERS first
fn fixture_tree(root: &Path) {
    write(root, "shop/OrderTest/table-ordering.txt", "ORDERS\nITEMS\n");
    write(
        root,
        "shop/OrderTest/ORDERS.csv",
        "[Scenario],ID,CUSTOMER,TOTAL\n,1,Alice,300\nbulkOrder,2,Bob,1250.50\n",
    );
    write(
        root,
        "shop/OrderTest/ITEMS.json",
        r#"[
            {"[Scenario]": "", "ID": 10, "ORDER_ID": 1, "SKU": "pen", "QTY": 3},
            {"[Scenario]": "bulkOrder", "ID": 11, "ORDER_ID": 2, "SKU": "paper", "QTY": null}
        ]"#,
    );
    write(root, "shop/OrderTest/bulkOrder-expected/table-ordering.txt", "ORDERS\nITEMS\n");
    write(
        root,
        "shop/OrderTest/bulkOrder-expected/ORDERS.csv",
        "ID,CUSTOMER,TOTAL\n1,Alice,300.00\n2,Bob,1250.5\n",
    );
    write(
        root,
        "shop/OrderTest/bulkOrder-expected/ITEMS.csv",
        "ID,SKU,QTY\n10,pen,3\n11,paper,\n",
    );
}

fn setup() -> (tempfile::TempDir, FixtureConfig, DataSourceRegistry) {
    let root = tempfile::tempdir().unwrap();
    fixture_tree(root.path());

    let mut config = FixtureConfig::testing();
    config.resource_root = root.path().to_path_buf();
    config.default_data_source = Some("shop".to_string());

    let registry = DataSourceRegistry::new();
    let mut db = SqliteDatabase::open_in_memory().unwrap();
    db.execute_batch(SCHEMA).unwrap();
    registry.register(DataSourceName::new("shop").unwrap(), db);

    (root, config, registry)
}

fn identity(name: &str) -> TestIdentity {
    TestIdentity::new("shop::OrderTest", name)
}

#[test]
fn clean_insert_then_verify_passes() {
    let (root, config, registry) = setup();
    let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

    // No directory named after the test, so the suite directory is used
    let prepare = config.prepare_request(identity("bulkOrder")).unwrap();
    assert_eq!(
        fixture.resolve(&prepare).unwrap(),
        root.path().join("shop").join("OrderTest")
    );
    let summary = fixture.prepare(&prepare).unwrap();
    assert_eq!(summary.operation, Operation::CleanInsert);
    assert_eq!(summary.total(), 4);

    let mut handler = CollectingHandler::new();
    fixture
        .verify(&config.verify_request(identity("bulkOrder")).unwrap(), &mut handler)
        .unwrap();
    let result = handler.finish();
    assert!(result.is_success(), "{:?}", result.mismatches());
}

#[test]
fn baseline_only_scenario_fails_verification() {
    let (_root, config, registry) = setup();
    let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

    let baseline = config
        .prepare_request(identity("bulkOrder"))
        .unwrap()
        .with_scenarios(vec![ScenarioName::new("somethingElse").unwrap()])
        .unwrap();
    assert_eq!(fixture.prepare(&baseline).unwrap().total(), 2);

    let mut handler = CollectingHandler::new();
    fixture
        .verify(&config.verify_request(identity("bulkOrder")).unwrap(), &mut handler)
        .unwrap();
    let result = handler.finish();
    let kinds: Vec<MismatchKind> = result.mismatches().iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![
            MismatchKind::RowCount,
            MismatchKind::MissingRow,
            MismatchKind::RowCount,
            MismatchKind::MissingRow,
        ]
    );
}

#[test]
fn second_clean_insert_replaces_rows_in_dependency_order() {
    let (_root, config, registry) = setup();
    let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();
    let request = config.prepare_request(identity("bulkOrder")).unwrap();

    fixture.prepare(&request).unwrap();
    // Deleting ORDERS before ITEMS would violate the foreign key
    fixture.prepare(&request).unwrap();

    fixture
        .verify(&config.verify_request(identity("bulkOrder")).unwrap(), &mut FailFast)
        .unwrap();
}

#[test]
fn update_of_absent_key_fails_and_loaded_data_compares_with_itself() {
    let (root, config, registry) = setup();
    let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

    let request = FixtureRequest::new(vec![ScenarioName::new("bulkOrder").unwrap()])
        .unwrap()
        .with_location(Some(format!("file:{}", root.path().join("shop/OrderTest").display())))
        .with_operation(Operation::Update);
    let shared = registry.get(&DataSourceName::new("shop").unwrap()).unwrap();
    let mut db = shared.lock().unwrap();
    match fixture.prepare_on(&mut *db, &request) {
        Err(ClientError::Execution(err)) => assert_eq!(err.operation, Operation::Update),
        other => panic!("Expected an execution error, got {:?}", other.map(|s| s.total())),
    }

    let data_set = fixture.load(&request).unwrap();
    ComparisonEngine::default()
        .compare_datasets(&data_set, &data_set, &mut FailFast)
        .unwrap();
}

#[test]
fn truncate_insert_writes_loaded_values() {
    let mut db = SqliteDatabase::open_in_memory().unwrap();
    db.execute_batch(SCHEMA).unwrap();
    let (_root, config, registry) = setup();
    let fixture = Fixture::with_registry(config.clone(), &registry).unwrap();

    let data_set = fixture
        .load(&config.prepare_request(identity("bulkOrder")).unwrap())
        .unwrap();
    OperationExecutor::new(&mut db)
        .execute(Operation::TruncateInsert, &data_set)
        .unwrap();

    let rows = db
        .query("SELECT CUSTOMER, TOTAL FROM ORDERS ORDER BY ID", &[])
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1][1].as_text(), Some("1250.5"));
}
