/// dbscenario - scenario-aware database fixtures
///
/// This is the root crate that provides workspace-level documentation.
/// Actual implementation is in the subcrates:
/// - `dbscenario-core`: data model, readers, scenario filtering, ordering and comparison
/// - `dbscenario-client`: database backends, operation execution and database assertions
/// - `dbscenario-cli`: command line front end
pub use dbscenario_client as client;
pub use dbscenario_core as core;

/// Returns the version of the package.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
