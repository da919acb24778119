use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

/// Format output as tables: scalar fields first, then one table per nested
/// list of records (pro forma years, audit findings, grid rows).
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => print_result_table(result, map),
            None => print_object(value),
        },
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    print_object(result);

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_object(value: &Value) {
    let mut scalars = Vec::new();
    let mut records = Vec::new();
    flatten("", value, &mut scalars, &mut records);

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &scalars {
            builder.push_record([key.as_str(), val.as_str()]);
        }
        println!("{}", Table::from(builder));
    }

    for (key, arr) in records {
        println!("\n{}:", key);
        print_array_table(arr);
    }
}

/// Split a value into dotted scalar fields and nested record lists.
fn flatten<'a>(
    prefix: &str,
    value: &'a Value,
    scalars: &mut Vec<(String, String)>,
    records: &mut Vec<(String, &'a [Value])>,
) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, val, scalars, records);
            }
        }
        Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
            records.push((prefix.to_string(), arr.as_slice()));
        }
        _ => scalars.push((prefix.to_string(), format_value(value))),
    }
}

fn flatten_row(value: &Value) -> Vec<(String, String)> {
    let mut scalars = Vec::new();
    let mut nested = Vec::new();
    flatten("", value, &mut scalars, &mut nested);
    scalars
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if arr.first().is_some_and(Value::is_object) {
        let rows: Vec<Vec<(String, String)>> = arr.iter().map(flatten_row).collect();
        let headers: Vec<String> = rows[0].iter().map(|(k, _)| k.clone()).collect();

        let mut builder = Builder::default();
        builder.push_record(&headers);
        for row in &rows {
            let cells: Vec<String> = headers
                .iter()
                .map(|h| {
                    row.iter()
                        .find(|(k, _)| k == h)
                        .map(|(_, v)| v.clone())
                        .unwrap_or_default()
                })
                .collect();
            builder.push_record(cells);
        }
        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_splits_records() {
        let v = json!({
            "score": 96,
            "metrics": {"irr": {"rate": "0.17"}},
            "findings": [{"title": "NOI positive", "status": "pass"}]
        });
        let mut scalars = Vec::new();
        let mut records = Vec::new();
        flatten("", &v, &mut scalars, &mut records);

        assert!(scalars.contains(&("score".to_string(), "96".to_string())));
        assert!(scalars.contains(&("metrics.irr.rate".to_string(), "0.17".to_string())));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, "findings");
    }
}
