//! Line-oriented declarative templates (`*.ttp`).
//!
//! A template is a list of line patterns with `{{ field }}` placeholders:
//!
//! ```text
//! {{ interface }} is {{ status }}, line protocol is {{ protocol }}
//!   Internet address is {{ ip_address }}
//! ```
//!
//! Literal text must match exactly (whitespace collapses to `\s+`); each
//! placeholder captures one whitespace-delimited token, or the rest of the
//! line when it is the final element. A new row starts every time the first
//! template line matches again, so repeating blocks yield one row per block.

use std::path::Path;

use regex::Regex;
use serde_json::Value;
use squall_domain::Row;

/// Parse raw CLI output with a line-template file.
///
/// Returns the parsed rows or a human-readable failure reason.
pub fn parse_line_template(raw: &str, template_path: &Path) -> Result<Vec<Row>, String> {
    if !template_path.exists() {
        return Err(format!(
            "template file not found: {}",
            template_path.display()
        ));
    }

    let text = std::fs::read_to_string(template_path)
        .map_err(|e| format!("template read error: {}", e))?;
    let patterns = compile_template(&text)?;
    if patterns.is_empty() {
        return Err("template has no patterns".to_string());
    }

    let mut rows: Vec<Row> = Vec::new();
    let mut current = Row::new();

    for line in raw.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        for (idx, pattern) in patterns.iter().enumerate() {
            let Some(caps) = pattern.captures(line.trim()) else {
                continue;
            };
            // The header line matching again means a new record begins.
            if idx == 0 && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
            }
            for name in pattern.capture_names().flatten() {
                if let Some(m) = caps.name(name) {
                    current.insert(name.to_string(), Value::String(m.as_str().to_string()));
                }
            }
            break;
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }

    if rows.is_empty() {
        return Err("0 rows returned".to_string());
    }
    Ok(rows)
}

/// Compile each non-empty template line into an anchored regex.
fn compile_template(text: &str) -> Result<Vec<Regex>, String> {
    let mut patterns = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        patterns.push(compile_line(line)?);
    }
    Ok(patterns)
}

fn compile_line(line: &str) -> Result<Regex, String> {
    let mut pattern = String::from("^");
    let mut rest = line;

    while let Some(start) = rest.find("{{") {
        let (literal, after) = rest.split_at(start);
        pattern.push_str(&escape_literal(literal));

        let Some(end) = after.find("}}") else {
            return Err(format!("unclosed placeholder in template line: {}", line));
        };
        let name = after[2..end].trim();
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
            || name.is_empty()
        {
            return Err(format!("invalid placeholder name '{}'", name));
        }

        rest = &after[end + 2..];
        if rest.trim().is_empty() {
            // Trailing placeholder swallows the rest of the line.
            pattern.push_str(&format!("(?P<{}>.+)", name));
        } else {
            pattern.push_str(&format!("(?P<{}>\\S+)", name));
        }
    }
    pattern.push_str(&escape_literal(rest));
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| format!("template line compile error: {}", e))
}

// Whitespace in template literals matches any run of whitespace in output.
fn escape_literal(literal: &str) -> String {
    let mut out = String::new();
    let mut in_space = false;
    for c in literal.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push_str("\\s+");
                in_space = true;
            }
        } else {
            in_space = false;
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn template(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ttp");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn one_row_per_header_match() {
        let (_d, path) = template("{{ interface }} is {{ status }}, line protocol is {{ protocol }}\n");
        let raw = "Ethernet1 is up, line protocol is up\nEthernet2 is down, line protocol is down\n";
        let rows = parse_line_template(raw, &path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["interface"], "Ethernet1");
        assert_eq!(rows[1]["status"], "down");
    }

    #[test]
    fn continuation_lines_merge_into_current_row() {
        let (_d, path) = template(
            "{{ interface }} is {{ status }}\nInternet address is {{ ip_address }}\n",
        );
        let raw = "Loopback0 is up\nInternet address is 10.0.0.1\nVlan10 is up\nInternet address is 10.0.10.1\n";
        let rows = parse_line_template(raw, &path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["ip_address"], "10.0.0.1");
        assert_eq!(rows[1]["interface"], "Vlan10");
    }

    #[test]
    fn trailing_placeholder_captures_remainder() {
        let (_d, path) = template("Description: {{ description }}\n");
        let rows = parse_line_template("Description: uplink to core switch\n", &path).unwrap();
        assert_eq!(rows[0]["description"], "uplink to core switch");
    }

    #[test]
    fn no_match_is_an_error_reason() {
        let (_d, path) = template("{{ a }} fixed {{ b }}\n");
        let err = parse_line_template("nothing matches here\n", &path).unwrap_err();
        assert!(err.contains("0 rows"));
    }

    #[test]
    fn unclosed_placeholder_is_rejected() {
        let (_d, path) = template("{{ broken\n");
        assert!(parse_line_template("x\n", &path).is_err());
    }
}
