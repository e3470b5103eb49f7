//! SQL text for the sink. Identifiers are always quoted; values are always bound.

use crate::types::cell_value::CellValue;
use crate::types::forecast_schema::{DEFAULT_PLATFORM_NAME, FORECAST_COLUMNS, FORECAST_KEY_COLUMNS};

/// Column every inserted row is stamped with.
pub const PLATFORM_COLUMN: &str = "platform_name";

/// Host parameters one statement may bind (SQLite's `SQLITE_MAX_VARIABLE_NUMBER`).
pub const MAX_BOUND_PARAMETERS: usize = 32766;

/// `"name"`, with embedded quotes doubled.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// `INSERT INTO "table" ("a", "b") VALUES (?, ?)`, in the given column order.
pub fn insert_statement<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        quote_list(columns),
        placeholders(columns.len())
    )
}

/// A `DELETE` matching `key_count` key tuples, narrowed by equality on `filter_columns`.
///
/// One key column gives `"k" IN (?, ?)`; several give
/// `("a", "b") IN (VALUES (?, ?), (?, ?))`. Parameters are the flattened key
/// tuples followed by one value per filter column.
pub fn delete_statement(
    table: &str,
    key_columns: &[&str],
    key_count: usize,
    filter_columns: &[&str],
) -> String {
    let key_match = match key_columns {
        [single] => format!(
            "{} IN ({})",
            quote_identifier(single),
            placeholders(key_count)
        ),
        _ => {
            let tuple = format!("({})", placeholders(key_columns.len()));
            format!(
                "({}) IN (VALUES {})",
                quote_list(key_columns),
                vec![tuple; key_count].join(", ")
            )
        }
    };

    let mut sql = format!("DELETE FROM {} WHERE {key_match}", quote_identifier(table));
    for column in filter_columns {
        sql.push_str(&format!(" AND {} = ?", quote_identifier(column)));
    }
    sql
}

/// Splits distinct keys into statement-sized batches. A zero size is treated as one.
pub fn key_chunks(keys: &[Vec<CellValue>], chunk_size: usize) -> Vec<&[Vec<CellValue>]> {
    keys.chunks(chunk_size.max(1)).collect()
}

/// The most key tuples one `DELETE` can carry before running out of bound parameters.
///
/// Each tuple binds one parameter per key column and every filter binds one more.
/// Never less than one.
pub fn max_keys_per_statement(key_columns: usize, filter_columns: usize) -> usize {
    (MAX_BOUND_PARAMETERS.saturating_sub(filter_columns) / key_columns.max(1)).max(1)
}

/// DDL for a forecast table plus its key index.
pub fn create_forecast_table_statement(table: &str) -> String {
    let columns = FORECAST_COLUMNS
        .iter()
        .map(|c| format!("    {} {}", quote_identifier(c.name), c.sql_type))
        .collect::<Vec<_>>()
        .join(",\n");
    let platform_default = format!("'{}'", DEFAULT_PLATFORM_NAME.replace('\'', "''"));
    let index = quote_identifier(&format!("{table}_key_idx"));

    format!(
        "CREATE TABLE IF NOT EXISTS {table_q} (
    \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,
    \"created_at\" TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    \"updated_at\" TIMESTAMP,
    {platform} TEXT NOT NULL DEFAULT {platform_default},
{columns}
);
CREATE INDEX IF NOT EXISTS {index} ON {table_q} ({keys});",
        table_q = quote_identifier(table),
        platform = quote_identifier(PLATFORM_COLUMN),
        keys = quote_list(&FORECAST_KEY_COLUMNS),
    )
}
