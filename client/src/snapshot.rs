//! Reading database tables back as fixture tables

use log::debug;

use dbscenario_core::{DataSet, QualifiedTable, Table, TableMetadata};

use crate::database::Database;
use crate::error::{ClientError, Result};
use crate::statements;

/// Read every row of a table, ordered by primary key (rowid or natural order without one)
pub fn snapshot_table(db: &mut dyn Database, metadata: &TableMetadata) -> Result<Table> {
    let statement = statements::select_all(db.dialect(), metadata);
    let rows = db.query(&statement.sql, &statement.params)?;
    debug!("Read {} rows from {}", rows.len(), metadata.table);

    let columns = metadata.columns.iter().map(|c| c.name.clone()).collect();
    let table = Table::from_values(metadata.table.table.clone(), columns, rows)?
        .with_schema(metadata.table.schema.clone());
    Ok(table)
}

/// Read several tables into a data set, in the given order
pub fn snapshot(db: &mut dyn Database, tables: &[QualifiedTable]) -> Result<DataSet> {
    let mut snapshots = Vec::with_capacity(tables.len());
    for table in tables {
        let metadata = db
            .table_metadata(table)?
            .ok_or_else(|| ClientError::TableNotFound(table.clone()))?;
        snapshots.push(snapshot_table(db, &metadata)?);
    }
    Ok(DataSet::new(snapshots)?)
}
