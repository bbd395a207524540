use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            match data {
                Some(Value::Object(fields)) => {
                    if let Some(target) = response.as_object_mut() {
                        target.extend(fields);
                    }
                }
                Some(other) => response["data"] = other,
                None => {}
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({
                collection_name: []
            }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output an API payload. Empty arrays go through [`output_empty_collection`].
pub fn output_value(
    output_format: &OutputFormat,
    collection_name: &str,
    value: &Value,
) -> anyhow::Result<()> {
    if matches!(value, Value::Array(items) if items.is_empty()) {
        return output_empty_collection(
            output_format,
            collection_name,
            &format!("No {} found", collection_name),
        );
    }

    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => match value {
            Value::Array(items) => {
                for item in items {
                    println!("{}", summarize(item));
                }
            }
            Value::Object(fields) => {
                for (key, field) in fields {
                    println!("{}: {}", key, scalar(field));
                }
            }
            other => println!("{}", scalar(other)),
        },
    }
    Ok(())
}

/// One-line rendering of a record for text listings
fn summarize(item: &Value) -> String {
    let id = item.get("id").map(scalar).unwrap_or_default();
    let label = ["name", "title", "email", "plate", "description"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str));

    match label {
        Some(label) if !id.is_empty() => format!("{}\t{}", id, label),
        Some(label) => label.to_string(),
        None => item.to_string(),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Parse a `--data` argument as JSON, reading stdin when it is `-`
pub fn read_json_argument(raw: &str) -> anyhow::Result<Value> {
    let text = if raw == "-" {
        let mut buffer = String::new();
        std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
        buffer
    } else {
        raw.to_string()
    };

    serde_json::from_str(&text).map_err(|e| anyhow::anyhow!("Invalid JSON payload: {}", e))
}
