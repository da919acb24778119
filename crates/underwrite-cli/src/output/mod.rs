pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter. A digest is plain text in
/// every format except JSON.
pub fn format_output(format: &OutputFormat, value: &Value) {
    if let (false, Some(text)) = (
        matches!(format, OutputFormat::Json),
        value.get("digest").and_then(Value::as_str),
    ) {
        print!("{text}");
        return;
    }

    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}
