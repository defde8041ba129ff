use std::collections::HashMap;

use regex::RegexBuilder;
use serde_json::Value;
use squall_domain::Row;

/// Parse raw CLI output with an inline regex from the collection config.
///
/// Flag names (`MULTILINE`, `DOTALL`, `IGNORECASE`) may be separated by
/// `|`, commas, or spaces; their effects union. Field extraction order:
/// the explicit `groups` map (field → capture index), then named groups,
/// then positional `field_1..N`.
pub fn parse_regex(
    raw: &str,
    pattern: &str,
    flags: &str,
    groups: &HashMap<String, usize>,
) -> Result<Vec<Row>, String> {
    if pattern.is_empty() {
        return Err("no pattern defined".to_string());
    }

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags
        .split(['|', ',', ' '])
        .map(str::trim)
        .filter(|f| !f.is_empty())
    {
        match flag.to_uppercase().as_str() {
            "MULTILINE" => {
                builder.multi_line(true);
            }
            "DOTALL" => {
                builder.dot_matches_new_line(true);
            }
            "IGNORECASE" => {
                builder.case_insensitive(true);
            }
            _ => {}
        }
    }

    let re = builder
        .build()
        .map_err(|e| format!("regex compile error: {}", e))?;

    let named: Vec<&str> = re.capture_names().flatten().collect();
    let mut rows = Vec::new();

    for caps in re.captures_iter(raw) {
        let mut row = Row::new();
        if !groups.is_empty() {
            for (field, idx) in groups {
                let value = caps
                    .get(*idx)
                    .map(|m| Value::String(m.as_str().to_string()))
                    .unwrap_or(Value::Null);
                row.insert(field.clone(), value);
            }
        } else if !named.is_empty() {
            for name in &named {
                if let Some(m) = caps.name(name) {
                    row.insert((*name).to_string(), Value::String(m.as_str().to_string()));
                }
            }
        } else {
            for i in 1..caps.len() {
                let value = caps
                    .get(i)
                    .map(|m| Value::String(m.as_str().to_string()))
                    .unwrap_or(Value::Null);
                row.insert(format!("field_{}", i), value);
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err("0 matches for pattern".to_string());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_groups() -> HashMap<String, usize> {
        HashMap::new()
    }

    #[test]
    fn groups_map_selects_capture_indices() {
        let mut groups = HashMap::new();
        groups.insert("name".to_string(), 1);
        groups.insert("state".to_string(), 2);

        let rows = parse_regex(
            "eth0 up\neth1 down\n",
            r"^(\S+)\s+(up|down)$",
            "MULTILINE",
            &groups,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "eth0");
        assert_eq!(rows[1]["state"], "down");
    }

    #[test]
    fn named_groups_without_map() {
        let rows = parse_regex(
            "pid 42 name router",
            r"pid (?P<pid>\d+) name (?P<name>\w+)",
            "",
            &no_groups(),
        )
        .unwrap();
        assert_eq!(rows[0]["pid"], "42");
        assert_eq!(rows[0]["name"], "router");
    }

    #[test]
    fn positional_fallback_fields() {
        let rows = parse_regex("a=1", r"(\w)=(\d)", "", &no_groups()).unwrap();
        assert_eq!(rows[0]["field_1"], "a");
        assert_eq!(rows[0]["field_2"], "1");
    }

    #[test]
    fn multiline_and_dotall_union() {
        // MULTILINE anchors ^ per line; DOTALL lets . cross the newline.
        let rows = parse_regex(
            "start\nmiddle\nend\n",
            r"^middle.end",
            "MULTILINE|DOTALL",
            &no_groups(),
        );
        assert!(rows.is_ok());

        // Without DOTALL the dot cannot cross the newline.
        let rows = parse_regex("start\nmiddle\nend\n", r"^middle.end", "MULTILINE", &no_groups());
        assert!(rows.is_err());
    }

    #[test]
    fn ignorecase_flag() {
        assert!(parse_regex("ERROR", "error", "IGNORECASE", &no_groups()).is_ok());
        assert!(parse_regex("ERROR", "error", "", &no_groups()).is_err());
    }

    #[test]
    fn bad_pattern_reports_compile_error() {
        let err = parse_regex("x", "(unclosed", "", &no_groups()).unwrap_err();
        assert!(err.contains("regex compile error"));
    }

    #[test]
    fn no_matches_reports_zero() {
        let err = parse_regex("abc", r"\d+", "", &no_groups()).unwrap_err();
        assert!(err.contains("0 matches"));
    }
}
