//! Juniper JunOS driver.
//!
//! JunOS quirks handled here:
//!   - `show chassis routing-engine` reports one row per RE on dual-RE
//!     chassis; the master's row becomes the flat payload
//!   - memory arrives as a direct utilization percentage, no subtraction
//!   - process rows come from `top` or `ps` (only the top variant carries
//!     WCPU), with kernel threads filtered out
//!   - syslog lines carry no numeric severity, so one is inferred from
//!     message keywords

use serde_json::Value;
use squall_domain::{CollectionReader, PayloadBody, Row};

use crate::driver::{default_shape_output, shared_post_process, VendorDriver};
use crate::helpers::{parse_mem_size_bytes, post_process_log, to_f64};

/// Kernel housekeeping threads excluded from the process panel.
const KERNEL_THREAD_NAMES: &[&str] = &["idle", "swapper", "intr", "vmdaemon", "pagedaemon"];
const KERNEL_THREAD_PREFIXES: &[&str] = &[
    "kernel", "irq/", "ksoftirqd", "kworker", "migration", "rcu_", "watchdog",
];

/// Message keyword → syslog severity. Scanned in order; first hit wins.
const SEVERITY_KEYWORDS: &[(&str, i64)] = &[
    ("emergency", 0),
    ("panic", 0),
    ("alert", 1),
    ("critical", 2),
    ("error", 3),
    ("err", 3),
    ("fail", 3),
    ("warning", 4),
    ("warn", 4),
    ("down", 4),
    ("notice", 5),
    ("info", 6),
    ("debug", 7),
];

pub struct JuniperJunosDriver;

impl VendorDriver for JuniperJunosDriver {
    fn vendor(&self) -> &'static str {
        "juniper_junos"
    }

    fn pagination_command(&self) -> &'static str {
        "set cli screen-length 0"
    }

    fn shape_output(&self, collection: &str, rows: Vec<Row>) -> PayloadBody {
        // Dual-RE chassis: promote the master's row to the flat payload
        // rather than blindly taking the first.
        if matches!(collection, "cpu" | "memory") && rows.len() > 1 {
            let master = rows.iter().position(is_master_row).unwrap_or(0);
            let mut rows = rows;
            let flat = rows.remove(master);
            return PayloadBody::Flat(flat);
        }
        default_shape_output(collection, rows)
    }

    fn post_process(
        &self,
        collection: &str,
        mut body: PayloadBody,
        store: &dyn CollectionReader,
    ) -> PayloadBody {
        let _ = store;
        match collection {
            "cpu" => {
                if let Some(flat) = body.as_flat_mut() {
                    normalize_cpu(flat);
                    shape_processes(flat);
                }
                body
            }
            "memory" => {
                if let Some(flat) = body.as_flat_mut() {
                    normalize_memory(flat);
                }
                body
            }
            "log" => {
                if let Some(rows) = body.as_rows_mut() {
                    for row in rows.iter_mut() {
                        infer_severity(row);
                    }
                    let processed = post_process_log(std::mem::take(rows), 50);
                    *rows = processed;
                }
                body
            }
            "neighbors" => {
                if let Some(rows) = body.as_rows_mut() {
                    for row in rows.iter_mut() {
                        infer_capabilities(row);
                    }
                }
                body
            }
            _ => shared_post_process(collection, body),
        }
    }
}

fn is_master_row(row: &Row) -> bool {
    ["status", "mastership_state"]
        .iter()
        .filter_map(|k| row.get(*k))
        .filter_map(Value::as_str)
        .any(|s| s.eq_ignore_ascii_case("master"))
}

/// RE CPU figures are idle-based; the derived total is instantaneous.
fn normalize_cpu(data: &mut Row) {
    if let Some(idle) = data
        .get("cpu_idle")
        .or_else(|| data.get("idle_pct"))
        .and_then(to_f64)
    {
        let total = ((100.0 - idle) * 10.0).round() / 10.0;
        for key in ["five_sec_total", "one_min", "five_min"] {
            if !data.contains_key(key) {
                data.insert(key.to_string(), Value::from(total));
            }
        }
        data.insert("five_sec_is_instantaneous".to_string(), Value::Bool(true));
    }
}

/// The RE reports memory utilization directly; no total/free subtraction.
fn normalize_memory(data: &mut Row) {
    if let Some(pct) = data
        .get("memory_utilization")
        .or_else(|| data.get("memory_buffer_utilization"))
        .or_else(|| data.get("used_pct"))
        .and_then(to_f64)
    {
        data.insert("used_pct".to_string(), Value::from(pct));
    }
}

/// Shape `top`/`ps` process rows: filter kernel threads, parse RES (unit-
/// suffixed or bare KB), default WCPU to 0 for the ps variant.
fn shape_processes(data: &mut Row) {
    let Some(Value::Array(raw)) = data.get("processes").cloned() else {
        return;
    };

    let mut procs = Vec::new();
    for value in raw {
        let Value::Object(mut proc) = value else { continue };

        let name = proc
            .get("name")
            .or_else(|| proc.get("command"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if is_kernel_thread(&name) {
            continue;
        }
        if !proc.contains_key("name") && !name.is_empty() {
            proc.insert("name".to_string(), Value::String(name));
        }

        // Only the top variant reports WCPU; ps output defaults to 0.
        let cpu = proc
            .get("wcpu")
            .or_else(|| proc.get("cpu_pct"))
            .and_then(to_f64)
            .unwrap_or(0.0);
        proc.insert("cpu_pct".to_string(), Value::from(cpu));
        proc.insert("five_sec".to_string(), Value::from(cpu));

        if let Some(res) = proc.get("res").cloned() {
            if let Some(bytes) = parse_mem_size_bytes(&res) {
                proc.insert("holding".to_string(), Value::from(bytes as i64));
            }
        }

        procs.push(Value::Object(proc));
    }

    data.insert("processes".to_string(), Value::Array(procs));
}

pub(crate) fn is_kernel_thread(name: &str) -> bool {
    let lowered = name.trim_start_matches('[').to_lowercase();
    KERNEL_THREAD_NAMES.iter().any(|n| lowered == *n)
        || KERNEL_THREAD_PREFIXES.iter().any(|p| lowered.starts_with(p))
}

/// Keyword-based severity inference — advisory, not authoritative. Rows
/// from the kernel facility default to 4, everything else to 6.
fn infer_severity(row: &mut Row) {
    if row.get("severity").and_then(to_f64).is_some() {
        return;
    }

    let message = row
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    let severity = SEVERITY_KEYWORDS
        .iter()
        .find(|(keyword, _)| message.contains(keyword))
        .map(|(_, sev)| *sev);

    let severity = severity.unwrap_or_else(|| {
        let facility = row
            .get("facility")
            .or_else(|| row.get("process"))
            .and_then(Value::as_str)
            .unwrap_or("");
        if facility.eq_ignore_ascii_case("kernel") {
            4
        } else {
            6
        }
    });
    row.insert("severity".to_string(), Value::from(severity));
}

/// LLDP rows without capabilities get them inferred from the platform name.
fn infer_capabilities(row: &mut Row) {
    let has_caps = row
        .get("capabilities")
        .and_then(Value::as_str)
        .map_or(false, |s| !s.trim().is_empty());
    if has_caps {
        return;
    }

    let platform = row
        .get("platform")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    let caps = if ["ex", "qfx", "switch"].iter().any(|k| platform.contains(k)) {
        "Bridge Router"
    } else if ["mx", "srx", "router", "firewall"].iter().any(|k| platform.contains(k)) {
        "Router"
    } else {
        "Router"
    };
    row.insert("capabilities".to_string(), Value::String(caps.to_string()));
}
