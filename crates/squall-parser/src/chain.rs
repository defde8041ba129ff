use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use squall_config::{CollectionSpec, ParserSpec, Schema};
use squall_domain::{FieldType, Provenance, Row};

use crate::line_template::parse_line_template;
use crate::regex_parser::parse_regex;
use crate::resolve::TemplateResolver;
use crate::sanitize::sanitize_cli_output;
use crate::textfsm::parse_textfsm;
use crate::trace::{ParseTrace, ParserAttempt};

/// Which parser backends and template sources are available.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub textfsm: bool,
    pub ttp: bool,
    pub regex: bool,
    pub community_templates: Option<String>,
    pub search_paths: Vec<String>,
}

/// Ordered parser chain: TextFSM → line templates → regex fallback.
///
/// The chain iterates the parsers declared in a collection descriptor; the
/// first to produce rows wins, and its identity rides along as provenance.
/// Failure is a returned value, never a panic or error.
pub struct ParserChain {
    resolver: TemplateResolver,
}

impl ParserChain {
    pub fn new(resolver: TemplateResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TemplateResolver {
        &self.resolver
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            textfsm: true,
            ttp: true,
            regex: true,
            community_templates: self
                .resolver
                .community_dir()
                .map(|p| p.display().to_string()),
            search_paths: self
                .resolver
                .search_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }

    /// Run the chain over raw CLI output.
    ///
    /// Returns the normalized, type-coerced rows plus provenance. On chain
    /// exhaustion: `([], parsed_by="none", error="all parsers failed (…)")`.
    pub fn parse(
        &self,
        raw: &str,
        spec: &CollectionSpec,
        schema: Option<&Schema>,
        trace: &mut ParseTrace,
    ) -> (Vec<Row>, Provenance) {
        if raw.trim().is_empty() {
            return (Vec::new(), Provenance::none("empty output"));
        }

        let cleaned = sanitize_cli_output(raw, Some(&spec.command), Some(trace));
        let mut errors: Vec<String> = Vec::new();

        for parser in &spec.parsers {
            match parser {
                ParserSpec::TextFsm { templates } => {
                    if let Some((rows, template)) =
                        self.try_templates("textfsm", templates, &cleaned, trace, parse_textfsm)
                    {
                        let rows = self.finish(rows, spec, schema, trace);
                        return (
                            rows,
                            Provenance {
                                parsed_by: "textfsm".into(),
                                template,
                                error: None,
                            },
                        );
                    }
                    errors.push("textfsm: no match".to_string());
                }
                ParserSpec::Ttp { templates } => {
                    if let Some((rows, template)) = self.try_templates(
                        "ttp",
                        templates,
                        &cleaned,
                        trace,
                        parse_line_template,
                    ) {
                        let rows = self.finish(rows, spec, schema, trace);
                        return (
                            rows,
                            Provenance {
                                parsed_by: "ttp".into(),
                                template,
                                error: None,
                            },
                        );
                    }
                    errors.push("ttp: no match".to_string());
                }
                ParserSpec::Regex {
                    pattern,
                    flags,
                    groups,
                } => match parse_regex(&cleaned, pattern, flags, groups) {
                    Ok(rows) => {
                        trace.parser_tried(ParserAttempt {
                            parser: "regex".into(),
                            template: "inline".into(),
                            success: true,
                            rows: rows.len(),
                            fields: field_names(&rows),
                            ..ParserAttempt::default()
                        });
                        let rows = self.finish(rows, spec, schema, trace);
                        return (
                            rows,
                            Provenance {
                                parsed_by: "regex".into(),
                                template: "inline".into(),
                                error: None,
                            },
                        );
                    }
                    Err(reason) => {
                        trace.parser_tried(ParserAttempt {
                            parser: "regex".into(),
                            template: "inline".into(),
                            success: false,
                            reason: reason.clone(),
                            ..ParserAttempt::default()
                        });
                        errors.push(format!("regex: {}", reason));
                    }
                },
            }
        }

        let detail = if errors.is_empty() {
            "no parsers defined".to_string()
        } else {
            errors.join("; ")
        };
        (
            Vec::new(),
            Provenance::none(format!("all parsers failed ({})", detail)),
        )
    }

    /// Try each template name in order with the given backend. The first
    /// template that resolves and yields rows wins; ordering is how a local
    /// override shadows a broken community template.
    fn try_templates(
        &self,
        parser: &str,
        templates: &[String],
        cleaned: &str,
        trace: &mut ParseTrace,
        backend: fn(&str, &std::path::Path) -> Result<Vec<Row>, String>,
    ) -> Option<(Vec<Row>, String)> {
        for name in templates {
            let Some(path) = self.resolver.resolve(name, Some(trace)) else {
                trace.parser_tried(ParserAttempt {
                    parser: parser.into(),
                    template: name.clone(),
                    success: false,
                    reason: "template not found in search paths".into(),
                    ..ParserAttempt::default()
                });
                continue;
            };

            match backend(cleaned, &path) {
                Ok(rows) => {
                    trace.parser_tried(ParserAttempt {
                        parser: parser.into(),
                        template: name.clone(),
                        resolved_path: Some(path.display().to_string()),
                        success: true,
                        rows: rows.len(),
                        fields: field_names(&rows),
                        ..ParserAttempt::default()
                    });
                    return Some((rows, name.clone()));
                }
                Err(reason) => {
                    trace.parser_tried(ParserAttempt {
                        parser: parser.into(),
                        template: name.clone(),
                        resolved_path: Some(path.display().to_string()),
                        success: false,
                        reason,
                        ..ParserAttempt::default()
                    });
                }
            }
        }
        None
    }

    fn finish(
        &self,
        rows: Vec<Row>,
        spec: &CollectionSpec,
        schema: Option<&Schema>,
        trace: &mut ParseTrace,
    ) -> Vec<Row> {
        let rows = normalize_rows(rows, &spec.normalize, trace);
        coerce_rows(rows, schema, trace)
    }
}

fn field_names(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|r| r.keys().cloned().collect())
        .unwrap_or_default()
}

// ── Normalize ─────────────────────────────────────────────────────────────────

/// Remap parser field names to canonical schema names.
///
/// The config map reads canonical → parser-produced; it is inverted here so
/// lookups go parser field → canonical. Unmapped fields pass through.
fn normalize_rows(
    rows: Vec<Row>,
    normalize: &HashMap<String, String>,
    trace: &mut ParseTrace,
) -> Vec<Row> {
    if normalize.is_empty() || rows.is_empty() {
        return rows;
    }

    let remap: HashMap<&str, &str> = normalize
        .iter()
        .map(|(canonical, parser_field)| (parser_field.as_str(), canonical.as_str()))
        .collect();

    let before = field_names(&rows);
    let normalized: Vec<Row> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| {
                    let canonical = remap.get(key.as_str()).map_or(key, |c| (*c).to_string());
                    (canonical, value)
                })
                .collect()
        })
        .collect();

    trace.normalized(
        before,
        field_names(&normalized),
        remap
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    );
    normalized
}

// ── Type coercion ─────────────────────────────────────────────────────────────

/// Coerce field values to the types declared in `_schema.yaml`.
///
/// Commas and percent signs are stripped before numeric parsing. A value
/// that refuses to coerce keeps its original form, never silently zeroed.
fn coerce_rows(rows: Vec<Row>, schema: Option<&Schema>, trace: &mut ParseTrace) -> Vec<Row> {
    let Some(schema) = schema else {
        return rows;
    };
    if schema.fields.is_empty() {
        return rows;
    }

    let mut changes: HashMap<String, String> = HashMap::new();
    let coerced: Vec<Row> = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| {
                    let Some(target) = schema.field_type(&key) else {
                        return (key, value);
                    };
                    match coerce_value(&value, target) {
                        Some(new_value) => {
                            if type_name(&new_value) != type_name(&value) {
                                changes.insert(
                                    key.clone(),
                                    format!("{}→{}", type_name(&value), type_name(&new_value)),
                                );
                            }
                            (key, new_value)
                        }
                        None => (key, value),
                    }
                })
                .collect()
        })
        .collect();

    if !changes.is_empty() {
        trace.coerced(changes);
    }
    coerced
}

fn coerce_value(value: &Value, target: FieldType) -> Option<Value> {
    if value.is_null() {
        return None;
    }
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    match target {
        FieldType::Int => {
            let cleaned = text.replace([',', '%'], "");
            cleaned
                .trim()
                .parse::<f64>()
                .ok()
                .map(|f| Value::from(f as i64))
        }
        FieldType::Float => {
            let cleaned = text.replace([',', '%'], "");
            cleaned.trim().parse::<f64>().ok().map(Value::from)
        }
        FieldType::Bool => {
            let lowered = text.trim().to_lowercase();
            Some(Value::Bool(matches!(
                lowered.as_str(),
                "true" | "1" | "yes"
            )))
        }
        FieldType::Str => Some(Value::String(text)),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
