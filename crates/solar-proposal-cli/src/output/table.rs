use colored::Colorize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, headers, is_simulation, line_rows, payload, row_cells, SCENARIOS};

const KPI_ROWS: [(&str, &str); 10] = [
    ("essentials", "total_capex"),
    ("essentials", "annual_net_profit"),
    ("essentials", "total_net_profit"),
    ("essentials", "monthly_opex"),
    ("essentials", "roi_pct"),
    ("essentials", "payback_months"),
    ("advanced", "npv"),
    ("advanced", "irr"),
    ("advanced", "lcoe"),
    ("multipliers", "tariff"),
];

/// Human-readable tables via tabled.
pub fn print_table(value: &Value) {
    match payload(value) {
        Value::Object(map) if is_simulation(map) => print_simulation(map),
        Value::Object(map) => {
            print_fields(map);
            if let Some(rows) = line_rows(map) {
                println!();
                print_rows(rows);
            }
        }
        Value::Array(rows) => print_rows(rows),
        other => println!("{}", cell(other)),
    }

    if let Some(envelope) = value.as_object() {
        print_footer(envelope);
    }
}

/// Scalar fields of an object; row collections are printed separately.
fn print_fields(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if key == "lines" {
            continue;
        }
        builder.push_record([key.as_str(), &cell(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_rows(rows: &[Value]) {
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }
    let header = headers(rows);
    let mut builder = Builder::default();
    builder.push_record(&header);
    for row in rows {
        builder.push_record(row_cells(row, &header));
    }
    println!("{}", Table::from(builder));
}

/// KPI comparison across scenarios, then the base case year by year.
fn print_simulation(map: &Map<String, Value>) {
    if let Some(projection) = map.get("tariff_projection").and_then(Value::as_object) {
        println!(
            "Tariff projection: {} ({} history points)",
            projection.get("method").map(cell).unwrap_or_default(),
            projection.get("points_used").map(cell).unwrap_or_default()
        );
    }

    let mut builder = Builder::default();
    let mut header = vec!["KPI".to_string()];
    header.extend(SCENARIOS.iter().map(|s| s.to_string()));
    builder.push_record(header);
    for (section, kpi) in KPI_ROWS {
        let mut row = vec![if section == "multipliers" {
            "tariff_multiplier".to_string()
        } else {
            kpi.to_string()
        }];
        for scenario in SCENARIOS {
            let v = map
                .get(scenario)
                .and_then(|s| s.get(section))
                .and_then(|s| s.get(kpi))
                .map(cell)
                .unwrap_or_default();
            row.push(v);
        }
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));

    if let Some(years) = map
        .get("base")
        .and_then(|b| b.get("years"))
        .and_then(Value::as_array)
    {
        println!("\nBase scenario:");
        print_rows(years);
    }
}

fn print_footer(envelope: &Map<String, Value>) {
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\n{}", "Warnings:".yellow().bold());
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }
    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}
