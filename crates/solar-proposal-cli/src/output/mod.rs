pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Scenario keys of a simulation result, in display order.
pub const SCENARIOS: [&str; 3] = ["base", "optimistic", "pessimistic"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The payload inside a computation envelope, or the value itself.
pub fn payload(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Whether the payload is a three-scenario simulation result.
pub fn is_simulation(map: &Map<String, Value>) -> bool {
    SCENARIOS.iter().all(|k| map.contains_key(*k))
}

/// Month-by-month rows (buyout table, installment schedule).
pub fn line_rows(map: &Map<String, Value>) -> Option<&Vec<Value>> {
    map.get("lines").and_then(Value::as_array)
}

/// Render a scalar cell. Nested values fall back to compact JSON.
pub fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_object() && !v.is_array()) => items
            .iter()
            .map(cell)
            .collect::<Vec<_>>()
            .join(", "),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Column headers of an array of flat objects, taken from the first row.
pub fn headers(rows: &[Value]) -> Vec<String> {
    rows.first()
        .and_then(Value::as_object)
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default()
}

/// One row of cells following `headers`.
pub fn row_cells(row: &Value, headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| row.get(h.as_str()).map(cell).unwrap_or_default())
        .collect()
}
