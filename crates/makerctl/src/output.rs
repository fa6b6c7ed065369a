//! Result presentation
//!
//! `auto` prints the one-line summary plus a key/value table of the details;
//! `json` and `yaml` serialize the whole result for scripting; `table`
//! renders the details alone.

use comfy_table::Table;
use makerctl_core::{CoreError, OpOutput};
use serde_json::Value;

#[derive(Debug, Clone, Copy, clap::ValueEnum, Default)]
pub enum OutputFormat {
    /// Human summary plus a table when there are details
    #[default]
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Table of the structured details
    Table,
}

pub fn print_output(output: &OpOutput, format: OutputFormat) -> Result<(), CoreError> {
    match format {
        OutputFormat::Auto => {
            println!("{}", output.summary);
            if !output.details.is_null() {
                print_as_table(&output.details);
            }
        }
        OutputFormat::Table => {
            if output.details.is_null() {
                println!("{}", output.summary);
            } else {
                print_as_table(&output.details);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(output)?);
        }
        OutputFormat::Yaml => {
            let rendered = serde_yaml::to_string(output)
                .map_err(|e| CoreError::Validation(format!("yaml rendering failed: {e}")))?;
            print!("{rendered}");
        }
    }
    Ok(())
}

fn print_as_table(value: &Value) {
    match value {
        Value::Array(items) if !items.is_empty() => {
            let mut table = Table::new();
            if let Value::Object(first) = &items[0] {
                let headers: Vec<String> = first.keys().cloned().collect();
                table.set_header(headers.clone());
                for item in items {
                    if let Value::Object(fields) = item {
                        let row: Vec<String> = headers
                            .iter()
                            .map(|h| format_value(fields.get(h).unwrap_or(&Value::Null)))
                            .collect();
                        table.add_row(row);
                    }
                }
            } else {
                table.set_header(vec!["Value"]);
                for item in items {
                    table.add_row(vec![format_value(item)]);
                }
            }
            println!("{table}");
        }
        Value::Object(fields) => {
            let mut table = Table::new();
            table.set_header(vec!["Key", "Value"]);
            for (key, value) in fields {
                table.add_row(vec![key.clone(), format_value(value)]);
            }
            println!("{table}");
        }
        _ => println!("{}", format_value(value)),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(fields) => format!("{{{} fields}}", fields.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_formatting() {
        assert_eq!(format_value(&Value::Null), "-");
        assert_eq!(format_value(&serde_json::json!(3)), "3");
        assert_eq!(format_value(&serde_json::json!("abc")), "abc");
        assert_eq!(format_value(&serde_json::json!(["a", "b"])), "a, b");
    }

    #[test]
    fn json_output_serializes_the_whole_result() {
        let output = OpOutput::new("Droplet x created", serde_json::json!({"id": 1}));
        assert!(print_output(&output, OutputFormat::Json).is_ok());
    }

    #[test]
    fn table_handles_every_shape() {
        print_as_table(&serde_json::json!({"a": 1, "b": [1, 2]}));
        print_as_table(&serde_json::json!([{"a": 1}, {"a": 2}]));
        print_as_table(&serde_json::json!([1, 2]));
        print_as_table(&serde_json::json!("plain"));
    }
}
