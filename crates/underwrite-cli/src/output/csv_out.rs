use serde_json::Value;
use std::io;

/// Record lists worth emitting as rows, looked up inside the result.
const RECORD_PATHS: &[&[&str]] = &[
    &["findings"],
    &["audit", "findings"],
    &["years"],
    &["projection", "years"],
];

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let records = RECORD_PATHS
        .iter()
        .find_map(|path| path.iter().try_fold(result, |v, key| v.get(*key)))
        .and_then(Value::as_array);

    if let Some(rows) = records {
        write_array_csv(&mut wtr, rows);
    } else if let Some(matrix) = result.get("matrix").and_then(Value::as_array) {
        write_grid_csv(&mut wtr, result, matrix);
    } else if let Value::Object(map) = result {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in map {
            let _ = wtr.write_record([key.as_str(), &format_csv_value(val)]);
        }
    } else if let Value::Array(arr) = result {
        write_array_csv(&mut wtr, arr);
    } else {
        let _ = wtr.write_record([&format_csv_value(result)]);
    }

    let _ = wtr.flush();
}

fn write_array_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(format_csv_value).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&format_csv_value(item)]);
        }
    }
}

/// Sensitivity grid: header row of variable_2 values, one row per variable_1 value.
fn write_grid_csv(wtr: &mut csv::Writer<io::StdoutLock<'_>>, result: &Value, matrix: &[Value]) {
    let values = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_csv_value).collect())
            .unwrap_or_default()
    };
    let rows = values("variable_1_values");
    let cols = values("variable_2_values");

    let corner = format!(
        "{}\\{}",
        result.get("variable_1").map(format_csv_value).unwrap_or_default(),
        result.get("variable_2").map(format_csv_value).unwrap_or_default()
    );
    let mut header = vec![corner];
    header.extend(cols);
    let _ = wtr.write_record(&header);

    for (label, cells) in rows.iter().zip(matrix) {
        let mut record = vec![label.clone()];
        if let Some(cells) = cells.as_array() {
            record.extend(cells.iter().map(format_csv_value));
        }
        let _ = wtr.write_record(&record);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
