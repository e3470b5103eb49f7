//! Writes row-sets to SQLite tables and removes previously written rows by key.
//!
//! Every operation runs inside one transaction: it either commits as a whole or
//! is rolled back and reported as [`SinkError::Persistence`]. Input validation
//! (table name, key columns) happens before a transaction is opened.

use crate::config::{DatabaseConfig, DEFAULT_DELETE_CHUNK_SIZE};
use crate::logging::Logger;
use crate::sink::error::SinkError;
use crate::sink::sql::{
    create_forecast_table_statement, delete_statement, insert_statement, key_chunks,
    max_keys_per_statement, PLATFORM_COLUMN,
};
use crate::types::cell_value::CellValue;
use crate::types::flat_row::FlatRow;
use crate::types::row_set::RowSet;
use crate::utils::ensure_parent_dir;
use rusqlite::{params_from_iter, Connection, Transaction};
use std::path::PathBuf;

/// Counts reported by [`TableSink::replace_forecast`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Stored rows removed because their key was in the new rows.
    pub deleted: usize,
    /// New rows written.
    pub inserted: usize,
}

/// A single long-lived SQLite connection plus the batching policy for deletes.
///
/// Not meant to be shared between threads; open one sink per worker.
pub struct TableSink {
    conn: Connection,
    chunk_size: usize,
    logger: Logger,
}

impl TableSink {
    /// Opens (or creates) the database file, creating its directory if needed.
    pub fn open(config: &DatabaseConfig, logger: Logger) -> Result<Self, SinkError> {
        ensure_parent_dir(&config.path)
            .map_err(|e| SinkError::CreateDir(config.path.clone(), e))?;

        let open_error = |source| SinkError::Open {
            path: config.path.clone(),
            source,
        };
        let conn = Connection::open(&config.path).map_err(open_error)?;
        conn.busy_timeout(config.busy_timeout).map_err(open_error)?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(open_error)?;

        let sink = Self::from_connection(conn, logger);
        sink.logger.info(format_args!(
            "Connected to {} database at {}",
            config.label(),
            config.path.display()
        ));
        Ok(sink)
    }

    /// A private in-memory database, gone when the sink is dropped.
    pub fn in_memory(logger: Logger) -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(|source| SinkError::Open {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        Ok(Self::from_connection(conn, logger))
    }

    /// Wraps an already opened connection.
    ///
    /// # Arguments
    ///
    /// * `conn` - The connection to use for every operation. No pragmas are applied.
    /// * `logger` - Receives this sink's log lines under the `weather_ingest::sink` target.
    ///
    /// # Returns
    ///
    /// A sink using [`DEFAULT_DELETE_CHUNK_SIZE`] keys per `DELETE`.
    pub fn from_connection(conn: Connection, logger: Logger) -> Self {
        Self {
            conn,
            chunk_size: DEFAULT_DELETE_CHUNK_SIZE,
            logger: logger.with_target("weather_ingest::sink"),
        }
    }

    /// Maximum number of key tuples per `DELETE` statement. Zero is treated as one.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// The configured keys per `DELETE`. Statements are capped further when this would
    /// bind more parameters than SQLite accepts.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The underlying connection, for inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Creates the forecast table and its key index if they do not exist.
    pub fn ensure_forecast_table(&mut self, table: &str) -> Result<(), SinkError> {
        validate_table(table)?;
        let ddl = create_forecast_table_statement(table);
        in_transaction(&mut self.conn, &self.logger, "ensure_forecast_table", |tx| {
            tx.execute_batch(&ddl)
        })?;
        self.logger
            .debug(format_args!("Ensured table {table} exists"));
        Ok(())
    }

    /// Appends every row of `rows` to `table`, stamping `platform_name` with `platform`.
    ///
    /// Columns are inserted in the row-set's column order. Missing cells and NaN
    /// become `NULL`. An empty row-set returns `Ok(0)` without opening a transaction.
    /// Rows are never de-duplicated against what is already stored.
    pub fn bulk_insert(
        &mut self,
        table: &str,
        rows: &RowSet,
        platform: &str,
    ) -> Result<usize, SinkError> {
        validate_table(table)?;
        if rows.is_empty() {
            self.logger
                .debug(format_args!("Nothing to insert into {table}"));
            return Ok(0);
        }

        let inserted = in_transaction(&mut self.conn, &self.logger, "bulk_insert", |tx| {
            insert_rows(tx, table, rows, platform)
        })?;
        self.logger
            .info(format_args!("Inserted {inserted} rows into {table}"));
        Ok(inserted)
    }

    /// Deletes rows of `table` whose `key_columns` match any row of `rows`.
    ///
    /// Duplicate key tuples in `rows` are collapsed first; the match-set is sent in
    /// chunks of [`TableSink::chunk_size`] keys, all inside one transaction.
    /// `extra_filters` narrows the delete to rows where each column equals its value.
    /// Returns the total number of rows deleted.
    ///
    /// # Errors
    ///
    /// [`SinkError::NoKeyColumns`] or [`SinkError::MissingKeyColumns`] before any SQL;
    /// [`SinkError::Persistence`] if a statement fails, after rolling back every chunk.
    pub fn delete_rows_by_keys(
        &mut self,
        table: &str,
        rows: &RowSet,
        key_columns: &[&str],
        extra_filters: &[(&str, CellValue)],
    ) -> Result<usize, SinkError> {
        let Some(keys) = prepare_keys(table, rows, key_columns)? else {
            return Ok(0);
        };

        let chunk_size = self.chunk_size;
        let logger = &self.logger;
        let deleted = in_transaction(&mut self.conn, logger, "delete_rows_by_keys", |tx| {
            delete_in_chunks(tx, logger, table, key_columns, &keys, extra_filters, chunk_size)
        })?;
        self.logger.info(format_args!(
            "Deleted {deleted} rows from {table} matching {} keys",
            keys.len()
        ));
        Ok(deleted)
    }

    /// Replaces the stored rows for every key in `rows` with `rows` itself.
    ///
    /// The delete-by-key and the insert share one transaction, so readers never
    /// observe the keys missing and a failure leaves the table untouched. Running it
    /// twice with the same rows leaves the same table contents.
    ///
    /// # Errors
    ///
    /// [`SinkError::NullKey`] before any SQL when a row has a null key cell, since a
    /// null never matches the delete and the insert would pile up copies.
    pub fn replace_forecast(
        &mut self,
        table: &str,
        rows: &RowSet,
        key_columns: &[&str],
        platform: &str,
    ) -> Result<ReplaceOutcome, SinkError> {
        let Some(keys) = prepare_keys(table, rows, key_columns)? else {
            return Ok(ReplaceOutcome::default());
        };
        reject_null_keys(&keys, key_columns)?;

        let chunk_size = self.chunk_size;
        let logger = &self.logger;
        let outcome = in_transaction(&mut self.conn, logger, "replace_forecast", |tx| {
            let deleted =
                delete_in_chunks(tx, logger, table, key_columns, &keys, &[], chunk_size)?;
            let inserted = insert_rows(tx, table, rows, platform)?;
            Ok(ReplaceOutcome { deleted, inserted })
        })?;
        self.logger.info(format_args!(
            "Replaced rows in {table}: {} deleted, {} inserted",
            outcome.deleted, outcome.inserted
        ));
        Ok(outcome)
    }

    /// Runs one statement in its own transaction and returns the affected row count.
    pub fn execute(&mut self, sql: &str, params: &[CellValue]) -> Result<usize, SinkError> {
        in_transaction(&mut self.conn, &self.logger, "execute", |tx| {
            tx.execute(sql, params_from_iter(params))
        })
    }

    /// Runs a query and returns its result as a row-set, columns in select order.
    pub fn query_rows(&mut self, sql: &str, params: &[CellValue]) -> Result<RowSet, SinkError> {
        in_transaction(&mut self.conn, &self.logger, "query_rows", |tx| {
            let mut statement = tx.prepare(sql)?;
            let names: Vec<String> = statement
                .column_names()
                .into_iter()
                .map(String::from)
                .collect();

            let mut result = RowSet::new();
            let mut rows = statement.query(params_from_iter(params))?;
            while let Some(row) = rows.next()? {
                let mut flat = FlatRow::new();
                for (index, name) in names.iter().enumerate() {
                    flat.insert(name.as_str(), CellValue::from(row.get_ref(index)?));
                }
                result.push(flat);
            }
            Ok(result)
        })
    }
}

fn validate_table(table: &str) -> Result<(), SinkError> {
    if table.trim().is_empty() {
        Err(SinkError::EmptyTableName)
    } else {
        Ok(())
    }
}

/// Validation shared by the keyed operations. `None` means there is nothing to do.
fn prepare_keys(
    table: &str,
    rows: &RowSet,
    key_columns: &[&str],
) -> Result<Option<Vec<Vec<CellValue>>>, SinkError> {
    validate_table(table)?;
    if key_columns.is_empty() {
        return Err(SinkError::NoKeyColumns);
    }
    if rows.is_empty() {
        return Ok(None);
    }
    Ok(Some(rows.distinct_keys(key_columns)?))
}

fn reject_null_keys(keys: &[Vec<CellValue>], key_columns: &[&str]) -> Result<(), SinkError> {
    for tuple in keys {
        if let Some(index) = tuple.iter().position(CellValue::is_missing) {
            return Err(SinkError::NullKey {
                column: key_columns[index].to_string(),
            });
        }
    }
    Ok(())
}

/// Runs `work` in a transaction. Commits on success; on failure rolls back and
/// wraps the cause.
fn in_transaction<T>(
    conn: &mut Connection,
    logger: &Logger,
    operation: &'static str,
    work: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
) -> Result<T, SinkError> {
    let tx = conn
        .transaction()
        .map_err(|source| SinkError::Persistence { operation, source })?;

    match work(&tx) {
        Ok(value) => {
            tx.commit().map_err(|source| {
                logger.error(format_args!("{operation} failed to commit: {source}"));
                SinkError::Persistence { operation, source }
            })?;
            Ok(value)
        }
        Err(source) => {
            logger.warn(format_args!("{operation} failed, rolling back: {source}"));
            if let Err(rollback_error) = tx.rollback() {
                logger.error(format_args!(
                    "{operation} rollback failed: {rollback_error}"
                ));
            }
            Err(SinkError::Persistence { operation, source })
        }
    }
}

fn insert_rows(
    tx: &Transaction<'_>,
    table: &str,
    rows: &RowSet,
    platform: &str,
) -> rusqlite::Result<usize> {
    let mut columns: Vec<&str> = rows.columns().iter().map(String::as_str).collect();
    if !columns.contains(&PLATFORM_COLUMN) {
        columns.push(PLATFORM_COLUMN);
    }

    let mut statement = tx.prepare(&insert_statement(table, columns.as_slice()))?;
    let platform = CellValue::from(platform);
    for row in rows {
        let values: Vec<CellValue> = columns
            .iter()
            .map(|column| match *column {
                PLATFORM_COLUMN => platform.clone(),
                column => row.get(column).map_or(CellValue::Null, CellValue::sanitized),
            })
            .collect();
        statement.execute(params_from_iter(&values))?;
    }
    Ok(rows.len())
}

fn delete_in_chunks(
    tx: &Transaction<'_>,
    logger: &Logger,
    table: &str,
    key_columns: &[&str],
    keys: &[Vec<CellValue>],
    extra_filters: &[(&str, CellValue)],
    chunk_size: usize,
) -> rusqlite::Result<usize> {
    let filter_columns: Vec<&str> = extra_filters.iter().map(|(column, _)| *column).collect();
    let filter_values = extra_filters.iter().map(|(_, value)| value.sanitized());

    let limit = max_keys_per_statement(key_columns.len(), filter_columns.len());
    if chunk_size > limit {
        logger.debug(format_args!(
            "Chunk size {chunk_size} exceeds the bound-parameter limit; using {limit} keys per statement"
        ));
    }
    let chunk_size = chunk_size.min(limit);

    let mut deleted = 0;
    for (index, chunk) in key_chunks(keys, chunk_size).into_iter().enumerate() {
        let sql = delete_statement(table, key_columns, chunk.len(), &filter_columns);
        let params: Vec<CellValue> = chunk
            .iter()
            .flatten()
            .cloned()
            .chain(filter_values.clone())
            .collect();
        let count = tx.execute(&sql, params_from_iter(&params))?;
        logger.debug(format_args!(
            "Delete chunk {} ({} keys) removed {count} rows from {table}",
            index + 1,
            chunk.len()
        ));
        deleted += count;
    }
    Ok(deleted)
}
