//! The recursive JSON-to-row walk.
//!
//! Every JSON value is classified into one of four shapes and handled by the
//! matching rule:
//!
//! | shape            | rule                                                  |
//! |------------------|-------------------------------------------------------|
//! | scalar           | stored under the accumulated column name              |
//! | list of scalars  | joined into one string with `", "`                    |
//! | list with nested | kept as a single JSON text cell (e.g. `hours`)        |
//! | object           | recursed into with `{column}_` as the new prefix      |

use crate::types::cell_value::CellValue;
use crate::types::flat_row::FlatRow;
use serde_json::{Map, Value};

/// Separator placed between a parent key and its child keys.
pub const KEY_SEPARATOR: &str = "_";

/// Separator used when joining a list of scalars into one cell.
pub const LIST_SEPARATOR: &str = ", ";

enum Shape<'a> {
    Scalar(&'a Value),
    ScalarList(&'a [Value]),
    NestedList(&'a [Value]),
    Object(&'a Map<String, Value>),
}

fn classify(value: &Value) -> Shape<'_> {
    match value {
        Value::Object(map) => Shape::Object(map),
        Value::Array(items) if items.iter().all(is_scalar) => Shape::ScalarList(items),
        Value::Array(items) => Shape::NestedList(items),
        scalar => Shape::Scalar(scalar),
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Flattens a JSON object into a single row.
///
/// Nested objects become `{parent}_{child}` columns at any depth; an empty
/// nested object contributes no columns.
pub fn flatten_object(object: &Map<String, Value>) -> FlatRow {
    let mut row = FlatRow::new();
    walk_into("", object, &mut row);
    row
}

/// Flattens a single named value into `row`, expanding it if it is an object.
pub fn flatten_value_into(column: &str, value: &Value, row: &mut FlatRow) {
    match classify(value) {
        Shape::Object(map) => walk_into(&format!("{column}{KEY_SEPARATOR}"), map, row),
        Shape::ScalarList(items) => row.insert(column, join_scalars(items)),
        Shape::NestedList(items) => row.insert(column, nested_list_text(items)),
        Shape::Scalar(scalar) => row.insert(column, CellValue::from_json(scalar)),
    }
}

fn walk_into(prefix: &str, object: &Map<String, Value>, row: &mut FlatRow) {
    for (key, value) in object {
        flatten_value_into(&format!("{prefix}{key}"), value, row);
    }
}

/// Joins scalars with `", "`. Nulls are skipped; strings are used verbatim.
pub fn join_scalars(items: &[Value]) -> String {
    items
        .iter()
        .filter(|item| !item.is_null())
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

fn nested_list_text(items: &[Value]) -> String {
    serde_json::to_string(items).unwrap_or_default()
}
