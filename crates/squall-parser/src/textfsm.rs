use std::path::Path;

use serde_json::Value;
use squall_domain::Row;
use textfsm_rust::Template;

/// Parse raw CLI output with a TextFSM template file.
///
/// Returns the parsed rows or a human-readable failure reason. TextFSM
/// declares values in uppercase; keys are lowercased here so the normalize
/// map and schema always see one casing.
pub fn parse_textfsm(raw: &str, template_path: &Path) -> Result<Vec<Row>, String> {
    if !template_path.exists() {
        return Err(format!(
            "template file not found: {}",
            template_path.display()
        ));
    }

    let text = std::fs::read_to_string(template_path)
        .map_err(|e| format!("template read error: {}", e))?;
    let template =
        Template::parse_str(&text).map_err(|e| format!("template syntax error: {}", e))?;

    let mut parser = template.parser();
    let rows: Vec<Row> = parser
        .parse_text_into(raw)
        .map_err(|e| format!("parse exception: {}", e))?;

    if rows.is_empty() {
        return Err("0 rows returned (pattern matched but no data extracted)".to_string());
    }

    Ok(rows.into_iter().map(lowercase_keys).collect())
}

fn lowercase_keys(row: Row) -> Row {
    row.into_iter()
        .map(|(k, v)| (k.to_lowercase(), stringify_scalar(v)))
        .collect()
}

// Scalar values come back typed from the template engine; everything is
// carried as a string until schema coercion. List values (TextFSM `List`
// options) stay as arrays of strings.
fn stringify_scalar(v: Value) -> Value {
    match v {
        Value::String(_) | Value::Array(_) => v,
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    }
}
