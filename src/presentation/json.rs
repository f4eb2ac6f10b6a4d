//! JSON rendering for scripting.

use serde_json::{Map, Value};

use super::{Layout, Table};

/// Column tables become an array of objects keyed by column name;
/// key/value tables become a single object.
pub fn render_json(table: &Table) -> serde_json::Result<String> {
    let value = match table.layout {
        Layout::Columns => Value::Array(
            table
                .rows
                .iter()
                .map(|row| {
                    let object: Map<String, Value> = table
                        .columns
                        .iter()
                        .zip(row)
                        .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
                        .collect();
                    Value::Object(object)
                })
                .collect(),
        ),
        Layout::KeyValue => Value::Object(
            table
                .rows
                .iter()
                .filter_map(|row| match row.as_slice() {
                    [key, value, ..] => Some((key.clone(), Value::String(value.clone()))),
                    _ => None,
                })
                .collect(),
        ),
    };
    serde_json::to_string_pretty(&value)
}
