//! PostgreSQL backend

use std::time::Duration;
use log::debug;
use ::postgres::types::{ToSql, Type};
use ::postgres::{Client, Config, NoTls, Row};

use dbscenario_core::{ColumnMetadata, ColumnName, DataValue, QualifiedTable, TableMetadata};

use crate::error::{to_conversion_error, DatabaseError};
use super::{Database, Dialect};

/// Columns of a table with their primary key position, in definition order
const TABLE_COLUMNS_QUERY: &str = r#"
    SELECT
        c.column_name::text AS column_name,
        c.udt_name::text AS udt_name,
        (c.is_nullable = 'YES') AS nullable,
        pk.key_position::int4 AS key_position
    FROM
        information_schema.columns c
    LEFT JOIN (
        SELECT
            kcu.column_name,
            kcu.ordinal_position AS key_position
        FROM
            information_schema.table_constraints tc
        JOIN
            information_schema.key_column_usage kcu
            ON kcu.constraint_name = tc.constraint_name
            AND kcu.table_schema = tc.table_schema
            AND kcu.table_name = tc.table_name
        WHERE
            tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_name::text = $1::text
            AND tc.table_schema::text = COALESCE($2::text, current_schema()::text)
    ) pk ON pk.column_name = c.column_name
    WHERE
        c.table_name::text = $1::text
        AND c.table_schema::text = COALESCE($2::text, current_schema()::text)
    ORDER BY
        c.ordinal_position
"#;

/// PostgreSQL database over the blocking client
pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    /// Connect with a connection string such as `host=localhost user=postgres`
    pub fn connect(connection_string: &str) -> Result<Self, DatabaseError> {
        Self::connect_with_timeout(connection_string, Duration::from_secs(30))
    }

    /// Connect, giving up after `timeout`
    pub fn connect_with_timeout(
        connection_string: &str,
        timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let mut config: Config = connection_string
            .parse()
            .map_err(|e: ::postgres::Error| DatabaseError::Connection(e.to_string()))?;
        config.connect_timeout(timeout);

        let client = config.connect(NoTls)?;
        Ok(Self::from_client(client))
    }

    /// Wrap an existing client
    pub fn from_client(client: Client) -> Self {
        PostgresDatabase { client }
    }

    /// Underlying client
    pub fn client(&mut self) -> &mut Client {
        &mut self.client
    }
}

fn to_postgres(params: &[DataValue]) -> Vec<Box<dyn ToSql + Sync>> {
    params
        .iter()
        .map(|value| -> Box<dyn ToSql + Sync> {
            match value {
                DataValue::Null => Box::new(None::<String>),
                DataValue::Text(text) => Box::new(text.clone()),
                DataValue::Binary(bytes) => Box::new(bytes.clone()),
            }
        })
        .collect()
}

fn from_postgres(row: &Row, index: usize) -> Result<DataValue, DatabaseError> {
    let text = |value: Option<String>| value.map(DataValue::Text);
    let value = match *row.columns()[index].type_() {
        Type::BYTEA => row.try_get::<_, Option<Vec<u8>>>(index)?.map(DataValue::Binary),
        Type::INT8 => text(row.try_get::<_, Option<i64>>(index)?.map(|v| v.to_string())),
        Type::INT4 => text(row.try_get::<_, Option<i32>>(index)?.map(|v| v.to_string())),
        Type::INT2 => text(row.try_get::<_, Option<i16>>(index)?.map(|v| v.to_string())),
        Type::FLOAT8 => text(row.try_get::<_, Option<f64>>(index)?.map(|v| v.to_string())),
        Type::FLOAT4 => text(row.try_get::<_, Option<f32>>(index)?.map(|v| v.to_string())),
        Type::BOOL => text(row.try_get::<_, Option<bool>>(index)?.map(|v| v.to_string())),
        _ => text(row.try_get::<_, Option<String>>(index)?),
    };
    Ok(value.unwrap_or(DataValue::Null))
}

impl Database for PostgresDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn table_metadata(
        &mut self,
        table: &QualifiedTable,
    ) -> Result<Option<TableMetadata>, DatabaseError> {
        let schema = table.schema.as_ref().map(|s| s.as_str());
        let rows = self
            .client
            .query(TABLE_COLUMNS_QUERY, &[&table.table.as_str(), &schema])?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("column_name")?;
            let udt_name: String = row.try_get("udt_name")?;
            let nullable: bool = row.try_get("nullable")?;
            let key_position: Option<i32> = row.try_get("key_position")?;

            let name = ColumnName::new(&name).map_err(to_conversion_error)?;
            let mut column = ColumnMetadata::new(name, udt_name);
            if let Some(position) = key_position {
                column = column.with_primary_key(position as u32);
            }
            columns.push(column.with_nullable(nullable && key_position.is_none()));
        }

        if columns.is_empty() {
            debug!("Table {} not found", table);
            return Ok(None);
        }
        Ok(Some(TableMetadata::new(table.clone(), columns)))
    }

    fn execute(&mut self, sql: &str, params: &[DataValue]) -> Result<u64, DatabaseError> {
        let owned = to_postgres(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref()).collect();
        Ok(self.client.execute(sql, &refs)?)
    }

    fn query(&mut self, sql: &str, params: &[DataValue]) -> Result<Vec<Vec<DataValue>>, DatabaseError> {
        let owned = to_postgres(params);
        let refs: Vec<&(dyn ToSql + Sync)> = owned.iter().map(|p| p.as_ref()).collect();
        let rows = self.client.query(sql, &refs)?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| from_postgres(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect()
    }

    fn truncate(&mut self, tables: &[QualifiedTable]) -> Result<(), DatabaseError> {
        if tables.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = tables
            .iter()
            .map(|table| Dialect::Postgres.quote_table(table))
            .collect();
        let sql = format!("TRUNCATE TABLE {} RESTART IDENTITY", names.join(", "));
        self.client.batch_execute(&sql)?;
        debug!("Truncated {}", names.join(", "));
        Ok(())
    }
}
