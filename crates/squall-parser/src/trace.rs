//! Structured audit log for the parser chain.
//!
//! Every poll attempt builds one trace with full provenance: what command
//! was sent, what came back, what sanitization removed, which templates were
//! tried in which order and why each failed, what normalize/coerce/post-
//! process produced, and the final field inventory delivered to the store.
//!
//! `emit()` writes a one-line human summary at INFO (WARN on failure) and
//! the full JSON record at DEBUG, making traces grep-friendly and
//! machine-parseable. A ring-buffered store keeps recent traces per
//! collection for the diagnostics surface.

use std::collections::{HashMap, VecDeque};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info, warn};

// ── Steps ─────────────────────────────────────────────────────────────────────

/// One recorded step of a parse attempt, in order of occurrence.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TraceStep {
    Raw {
        length: usize,
        command: String,
    },
    Sanitize {
        original_len: usize,
        cleaned_len: usize,
        lines_stripped: usize,
        delta: i64,
    },
    Resolve {
        template: String,
        resolved: Option<String>,
        found: bool,
        search_paths: Vec<String>,
    },
    Parse {
        parser: String,
        template: String,
        success: bool,
        rows: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolved_path: Option<String>,
        #[serde(skip_serializing_if = "String::is_empty")]
        reason: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<String>,
    },
    Normalize {
        before: Vec<String>,
        after: Vec<String>,
        remap: HashMap<String, String>,
    },
    Coerce {
        changes: HashMap<String, String>,
    },
    PostProcess {
        transform: String,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        added: Vec<String>,
    },
}

/// One parser attempt, recorded via [`ParseTrace::parser_tried`].
#[derive(Debug, Clone, Default)]
pub struct ParserAttempt {
    pub parser: String,
    pub template: String,
    pub resolved_path: Option<String>,
    pub success: bool,
    pub reason: String,
    pub rows: usize,
    pub fields: Vec<String>,
}

/// The final outcome of a trace.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceResult {
    pub parsed_by: String,
    pub template: String,
    pub fields: Vec<String>,
    pub rows: usize,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A completed trace, as stored in the ring and logged at DEBUG.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub collection: String,
    pub vendor: String,
    pub command: String,
    pub timestamp: f64,
    pub raw_len: usize,
    pub raw_preview: String,
    pub steps: Vec<TraceStep>,
    pub result: TraceResult,
    pub duration_ms: f64,
}

impl TraceRecord {
    pub fn failed(&self) -> bool {
        self.result.parsed_by == "none" || self.result.error.is_some()
    }
}

// ── ParseTrace ────────────────────────────────────────────────────────────────

/// Accumulates parse provenance for one collection poll.
///
/// Build incrementally as data flows through the chain, then `emit()` to
/// write a single structured log record.
#[derive(Debug)]
pub struct ParseTrace {
    collection: String,
    vendor: String,
    command: String,
    started: Instant,
    timestamp: f64,
    raw_len: usize,
    raw_preview: String,
    steps: Vec<TraceStep>,
    result: Option<TraceResult>,
}

impl ParseTrace {
    pub fn new(collection: impl Into<String>, vendor: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            collection: collection.into(),
            vendor: vendor.into(),
            command: String::new(),
            started: Instant::now(),
            timestamp,
            raw_len: 0,
            raw_preview: String::new(),
            steps: Vec::new(),
            result: None,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    // ── Recording ─────────────────────────────────────────────────────────────

    pub fn raw_received(&mut self, raw: &str, command: &str) {
        self.command = command.to_string();
        self.raw_len = raw.len();
        self.raw_preview = raw.chars().take(200).collect::<String>().replace('\n', "\\n");
        self.steps.push(TraceStep::Raw {
            length: self.raw_len,
            command: command.to_string(),
        });
    }

    pub fn sanitized(&mut self, cleaned_len: usize, lines_stripped: usize) {
        self.steps.push(TraceStep::Sanitize {
            original_len: self.raw_len,
            cleaned_len,
            lines_stripped,
            delta: self.raw_len as i64 - cleaned_len as i64,
        });
    }

    pub fn template_resolved(
        &mut self,
        template: &str,
        resolved: Option<&str>,
        search_paths: Vec<String>,
    ) {
        self.steps.push(TraceStep::Resolve {
            template: template.to_string(),
            resolved: resolved.map(str::to_string),
            found: resolved.is_some(),
            search_paths,
        });
    }

    pub fn parser_tried(&mut self, attempt: ParserAttempt) {
        self.steps.push(TraceStep::Parse {
            parser: attempt.parser,
            template: attempt.template,
            success: attempt.success,
            rows: attempt.rows,
            resolved_path: attempt.resolved_path,
            reason: attempt.reason,
            fields: attempt.fields,
        });
    }

    pub fn normalized(
        &mut self,
        before: Vec<String>,
        after: Vec<String>,
        remap: HashMap<String, String>,
    ) {
        self.steps.push(TraceStep::Normalize { before, after, remap });
    }

    pub fn coerced(&mut self, changes: HashMap<String, String>) {
        self.steps.push(TraceStep::Coerce { changes });
    }

    pub fn post_processed(&mut self, transform: &str, added: Vec<String>) {
        self.steps.push(TraceStep::PostProcess {
            transform: transform.to_string(),
            added,
        });
    }

    /// Record final delivery (or terminal failure) and stamp the duration.
    pub fn delivered(
        &mut self,
        parsed_by: &str,
        template: &str,
        fields: Vec<String>,
        rows: usize,
        error: Option<String>,
    ) {
        self.result = Some(TraceResult {
            parsed_by: parsed_by.to_string(),
            template: template.to_string(),
            fields,
            rows,
            duration_ms: round1(self.started.elapsed().as_secs_f64() * 1000.0),
            error,
        });
    }

    // ── Introspection ─────────────────────────────────────────────────────────

    pub fn parsers_tried(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, TraceStep::Parse { .. }))
            .count()
    }

    pub fn parsers_failed(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, TraceStep::Parse { success: false, .. }))
            .count()
    }

    // ── Output ────────────────────────────────────────────────────────────────

    pub fn into_record(self) -> TraceRecord {
        let duration_ms = round1(self.started.elapsed().as_secs_f64() * 1000.0);
        let result = self.result.unwrap_or_else(|| TraceResult {
            parsed_by: "none".to_string(),
            error: Some("trace incomplete".to_string()),
            duration_ms,
            ..TraceResult::default()
        });
        TraceRecord {
            collection: self.collection,
            vendor: self.vendor,
            command: self.command,
            timestamp: self.timestamp,
            raw_len: self.raw_len,
            raw_preview: self.raw_preview,
            steps: self.steps,
            result,
            duration_ms,
        }
    }

    /// Log the trace: summary line at INFO/WARN, full record at DEBUG.
    /// Returns the record for ring storage.
    pub fn emit(self) -> TraceRecord {
        let record = self.into_record();
        let result = &record.result;

        let mut summary = format!(
            "[{}] parsed_by={} rows={} fields={} duration={}ms",
            record.collection,
            result.parsed_by,
            result.rows,
            result.fields.len(),
            result.duration_ms,
        );
        if let Some(err) = &result.error {
            summary.push_str(&format!(" ERROR={}", err));
        }

        if record.failed() {
            warn!("TRACE {}", summary);
        } else {
            info!("TRACE {}", summary);
        }

        if let Ok(json) = serde_json::to_string(&record) {
            debug!("TRACE_DETAIL {}", json);
        }

        record
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ── Trace store ───────────────────────────────────────────────────────────────

/// Rollup of parse health for one collection.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub last_parsed_by: String,
    pub last_template: String,
    pub last_error: Option<String>,
    pub last_duration_ms: f64,
    pub recent_failures: usize,
    pub total_traces: usize,
}

/// Ring buffer of recent parse traces, per collection.
#[derive(Debug)]
pub struct ParseTraceStore {
    max_per_collection: usize,
    traces: HashMap<String, VecDeque<TraceRecord>>,
}

impl Default for ParseTraceStore {
    fn default() -> Self {
        Self::new(20)
    }
}

impl ParseTraceStore {
    pub fn new(max_per_collection: usize) -> Self {
        Self {
            max_per_collection,
            traces: HashMap::new(),
        }
    }

    pub fn store(&mut self, record: TraceRecord) {
        let ring = self.traces.entry(record.collection.clone()).or_default();
        ring.push_back(record);
        while ring.len() > self.max_per_collection {
            ring.pop_front();
        }
    }

    /// The `n` most recent traces for a collection, oldest first.
    pub fn recent(&self, collection: &str, n: usize) -> Vec<&TraceRecord> {
        self.traces
            .get(collection)
            .map(|ring| {
                let skip = ring.len().saturating_sub(n);
                ring.iter().skip(skip).collect()
            })
            .unwrap_or_default()
    }

    /// All retained failures, optionally filtered by collection.
    pub fn failures(&self, collection: Option<&str>) -> Vec<&TraceRecord> {
        self.traces
            .iter()
            .filter(|(name, _)| collection.map_or(true, |c| c == name.as_str()))
            .flat_map(|(_, ring)| ring.iter().filter(|r| r.failed()))
            .collect()
    }

    /// The most recent trace for every collection.
    pub fn latest_all(&self) -> HashMap<&str, &TraceRecord> {
        self.traces
            .iter()
            .filter_map(|(name, ring)| ring.back().map(|r| (name.as_str(), r)))
            .collect()
    }

    /// Parse health rollup keyed by collection.
    pub fn summary(&self) -> HashMap<String, TraceSummary> {
        self.traces
            .iter()
            .filter_map(|(name, ring)| {
                let latest = ring.back()?;
                let recent_failures = ring.iter().filter(|r| r.result.parsed_by == "none").count();
                Some((
                    name.clone(),
                    TraceSummary {
                        last_parsed_by: latest.result.parsed_by.clone(),
                        last_template: latest.result.template.clone(),
                        last_error: latest.result.error.clone(),
                        last_duration_ms: latest.result.duration_ms,
                        recent_failures,
                        total_traces: ring.len(),
                    },
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(collection: &str, parsed_by: &str) -> TraceRecord {
        let mut trace = ParseTrace::new(collection, "cisco_ios");
        trace.raw_received("output", "show something");
        let error = (parsed_by == "none").then(|| "all parsers failed".to_string());
        trace.delivered(parsed_by, "", vec![], 0, error);
        trace.into_record()
    }

    #[test]
    fn ring_drops_oldest_first() {
        let mut store = ParseTraceStore::new(3);
        for i in 0..5 {
            let mut r = record("cpu", "regex");
            r.raw_len = i;
            store.store(r);
        }
        let recent = store.recent("cpu", 10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].raw_len, 2, "oldest retained should be the third stored");
        assert_eq!(recent[2].raw_len, 4);
    }

    #[test]
    fn failures_filtered_by_collection() {
        let mut store = ParseTraceStore::new(10);
        store.store(record("cpu", "none"));
        store.store(record("cpu", "regex"));
        store.store(record("memory", "none"));

        assert_eq!(store.failures(None).len(), 2);
        assert_eq!(store.failures(Some("cpu")).len(), 1);
        assert_eq!(store.failures(Some("interfaces")).len(), 0);
    }

    #[test]
    fn summary_counts_recent_failures() {
        let mut store = ParseTraceStore::new(10);
        store.store(record("cpu", "none"));
        store.store(record("cpu", "textfsm"));

        let summary = store.summary();
        let cpu = &summary["cpu"];
        assert_eq!(cpu.last_parsed_by, "textfsm");
        assert_eq!(cpu.recent_failures, 1);
        assert_eq!(cpu.total_traces, 2);
    }

    #[test]
    fn incomplete_trace_records_failure() {
        let trace = ParseTrace::new("cpu", "cisco_ios");
        let record = trace.into_record();
        assert_eq!(record.result.parsed_by, "none");
        assert!(record.failed());
    }

    #[test]
    fn parser_attempt_counters() {
        let mut trace = ParseTrace::new("cpu", "cisco_ios");
        trace.parser_tried(ParserAttempt {
            parser: "textfsm".into(),
            template: "a.textfsm".into(),
            success: false,
            reason: "template not found".into(),
            ..ParserAttempt::default()
        });
        trace.parser_tried(ParserAttempt {
            parser: "regex".into(),
            template: "inline".into(),
            success: true,
            rows: 3,
            ..ParserAttempt::default()
        });
        assert_eq!(trace.parsers_tried(), 2);
        assert_eq!(trace.parsers_failed(), 1);
    }
}
