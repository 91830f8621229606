use serde_json::Value;

use super::{cell, is_simulation, payload, SCENARIOS};

/// The headline figure of each command, in lookup order.
const HEADLINE_KEYS: [&str; 5] = [
    "total",
    "buyout_value",
    "discounted_tariff",
    "charge",
    "total_paid",
];

/// Print just the answer: the headline field of the result, or for a
/// simulation one `scenario npv irr payback` line per scenario.
pub fn print_minimal(value: &Value) {
    let result = payload(value);

    let Value::Object(map) = result else {
        println!("{}", cell(result));
        return;
    };

    if is_simulation(map) {
        for scenario in SCENARIOS {
            let s = &map[scenario];
            println!(
                "{scenario} npv={} irr={} payback_months={}",
                cell(&s["advanced"]["npv"]),
                cell(&s["advanced"]["irr"]),
                cell(&s["essentials"]["payback_months"])
            );
        }
        return;
    }

    if let Some(val) = HEADLINE_KEYS
        .iter()
        .filter_map(|k| map.get(*k))
        .find(|v| !v.is_null())
    {
        println!("{}", cell(val));
        return;
    }

    // Installment schedule: one total per month
    if let Some(lines) = map.get("lines").and_then(Value::as_array) {
        for line in lines {
            println!("{}\t{}", cell(&line["month"]), cell(&line["total"]));
        }
        return;
    }

    if let Some(tariffs) = map.get("tariffs") {
        println!("{}", cell(tariffs));
        return;
    }

    if let Some((key, val)) = map.iter().next() {
        println!("{key}: {}", cell(val));
    }
}
