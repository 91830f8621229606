use serde_json::{Map, Value};
use std::io;

use super::{cell, headers, is_simulation, line_rows, payload, row_cells, SCENARIOS};

type StdoutWriter<'a> = csv::Writer<io::StdoutLock<'a>>;

/// CSV on stdout: one row per month or year where the result has rows,
/// otherwise `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let written = match payload(value) {
        Value::Object(map) if is_simulation(map) => write_simulation(&mut wtr, map),
        Value::Object(map) => match line_rows(map) {
            Some(rows) => write_rows(&mut wtr, rows),
            None => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        other => wtr.write_record([cell(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(Into::into)) {
        eprintln!("CSV output error: {e}");
    }
}

fn write_fields(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &cell(val)])?;
    }
    Ok(())
}

fn write_rows(wtr: &mut StdoutWriter<'_>, rows: &[Value]) -> csv::Result<()> {
    let header = headers(rows);
    if header.is_empty() {
        return Ok(());
    }
    wtr.write_record(&header)?;
    for row in rows {
        wtr.write_record(row_cells(row, &header))?;
    }
    Ok(())
}

/// Year records of all scenarios stacked, tagged by a leading column.
fn write_simulation(wtr: &mut StdoutWriter<'_>, map: &Map<String, Value>) -> csv::Result<()> {
    let years = |scenario: &str| {
        map.get(scenario)
            .and_then(|s| s.get("years"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    let header = headers(&years("base"));
    if header.is_empty() {
        return Ok(());
    }
    let mut record = vec!["scenario".to_string()];
    record.extend(header.iter().cloned());
    wtr.write_record(&record)?;

    for scenario in SCENARIOS {
        for row in years(scenario) {
            let mut record = vec![scenario.to_string()];
            record.extend(row_cells(&row, &header));
            wtr.write_record(&record)?;
        }
    }
    Ok(())
}
