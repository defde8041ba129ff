//! Arista EOS driver.
//!
//! EOS is Linux underneath: CPU and process figures come from `top`, memory
//! from total/free counters, and interface rates are printed as
//! unit-suffixed strings (`"1.23 Mbps"`). LLDP neighbor rows carry FQDNs
//! and long system descriptions that need trimming for the dashboard graph.

use serde_json::Value;
use squall_domain::{CollectionReader, PayloadBody, Row};

use crate::driver::{shared_post_process, VendorDriver};
use crate::helpers::{parse_mem_size_bytes, parse_rate_bps, to_f64};

/// Processes kept after sorting by CPU then memory.
const TOP_PROCESS_LIMIT: usize = 20;

pub struct AristaEosDriver;

impl VendorDriver for AristaEosDriver {
    fn vendor(&self) -> &'static str {
        "arista_eos"
    }

    fn pagination_command(&self) -> &'static str {
        "terminal length 0"
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
                    crate::cisco_nxos::normalize_cpu(flat);
                    shape_top_processes(flat);
                }
                body
            }
            "neighbors" => {
                if let Some(rows) = body.as_rows_mut() {
                    for row in rows.iter_mut() {
                        enrich_lldp_neighbor(row);
                    }
                }
                body
            }
            "interface_detail" => {
                if let Some(rows) = body.as_rows_mut() {
                    for row in rows.iter_mut() {
                        enrich_interface_rates(row);
                    }
                }
                body
            }
            _ => shared_post_process(collection, body),
        }
    }
}

// ── CPU processes (top) ───────────────────────────────────────────────────────

/// Shape `top` process rows: parse RES into bytes, alias the dashboard
/// fields, and keep the top 20 by CPU then memory.
fn shape_top_processes(data: &mut Row) {
    let Some(Value::Array(raw)) = data.get("processes").cloned() else {
        return;
    };

    let mut procs: Vec<Row> = Vec::new();
    for value in raw {
        let Value::Object(mut proc) = value else { continue };

        let cpu = proc.get("cpu_pct").or_else(|| proc.get("cpu")).and_then(to_f64).unwrap_or(0.0);
        proc.insert("cpu_pct".to_string(), Value::from(cpu));
        proc.insert("five_sec".to_string(), Value::from(cpu));

        if let Some(res) = proc.get("res").cloned() {
            if let Some(bytes) = parse_mem_size_bytes(&res) {
                proc.insert("holding".to_string(), Value::from(bytes as i64));
            }
        }
        if !proc.contains_key("name") {
            if let Some(cmd) = proc.get("command").cloned() {
                proc.insert("name".to_string(), cmd);
            }
        }
        procs.push(proc);
    }

    procs.sort_by(|a, b| {
        let cpu_a = a.get("cpu_pct").and_then(to_f64).unwrap_or(0.0);
        let cpu_b = b.get("cpu_pct").and_then(to_f64).unwrap_or(0.0);
        cpu_b
            .partial_cmp(&cpu_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                let mem_a = a.get("holding").and_then(to_f64).unwrap_or(0.0);
                let mem_b = b.get("holding").and_then(to_f64).unwrap_or(0.0);
                mem_b.partial_cmp(&mem_a).unwrap_or(std::cmp::Ordering::Equal)
            })
    });
    procs.truncate(TOP_PROCESS_LIMIT);

    data.insert(
        "processes".to_string(),
        Value::Array(procs.into_iter().map(Value::Object).collect()),
    );
}

// ── LLDP ──────────────────────────────────────────────────────────────────────

/// Trim an LLDP neighbor row for graph rendering: strip the FQDN down to
/// its first label (IP addresses kept whole), infer a platform from the
/// system description, and add abbreviated interface names for edges.
fn enrich_lldp_neighbor(row: &mut Row) {
    if let Some(Value::String(device_id)) = row.get("device_id").cloned() {
        row.insert(
            "device_id".to_string(),
            Value::String(strip_fqdn(&device_id)),
        );
    }

    if row.get("platform").map_or(true, is_blank) {
        if let Some(Value::String(descr)) = row.get("system_description") {
            if let Some(platform) = infer_platform(descr) {
                row.insert("platform".to_string(), Value::String(platform.to_string()));
            }
        }
    }

    for (field, short_field) in [
        ("local_intf", "local_intf_short"),
        ("remote_intf", "remote_intf_short"),
    ] {
        if let Some(Value::String(name)) = row.get(field) {
            let short = abbreviate_interface(name);
            row.insert(short_field.to_string(), Value::String(short));
        }
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// `core-sw1.example.net` → `core-sw1`; dotted quads stay whole.
pub(crate) fn strip_fqdn(name: &str) -> String {
    let looks_like_ip = name.split('.').all(|part| part.parse::<u8>().is_ok());
    if looks_like_ip {
        return name.to_string();
    }
    name.split('.').next().unwrap_or(name).to_string()
}

pub(crate) fn infer_platform(description: &str) -> Option<&'static str> {
    let lowered = description.to_lowercase();
    if lowered.contains("arista") || lowered.contains("eos") {
        Some("Arista EOS")
    } else if lowered.contains("nx-os") || lowered.contains("nexus") {
        Some("Cisco NX-OS")
    } else if lowered.contains("cisco") || lowered.contains("ios") {
        Some("Cisco IOS")
    } else if lowered.contains("junos") || lowered.contains("juniper") {
        Some("Juniper JunOS")
    } else if lowered.contains("linux") {
        Some("Linux")
    } else {
        None
    }
}

/// `Ethernet49/1` → `Et49/1`, `Management1` → `Ma1`, `Port-Channel10` → `Po10`.
pub(crate) fn abbreviate_interface(name: &str) -> String {
    const ABBREVIATIONS: &[(&str, &str)] = &[
        ("Port-Channel", "Po"),
        ("Ethernet", "Et"),
        ("Management", "Ma"),
        ("Loopback", "Lo"),
        ("Vlan", "Vl"),
        ("Tunnel", "Tu"),
    ];
    for (long, short) in ABBREVIATIONS {
        if let Some(rest) = name.strip_prefix(long) {
            return format!("{}{}", short, rest);
        }
    }
    name.to_string()
}

// ── Interface rates ───────────────────────────────────────────────────────────

/// EOS prints rates like `"1.23 Mbps"`; convert to bps ints, defaulting 0.
fn enrich_interface_rates(row: &mut Row) {
    let in_bps = parse_rate_bps(row.get("input_rate_bps").or_else(|| row.get("input_rate")));
    let out_bps = parse_rate_bps(row.get("output_rate_bps").or_else(|| row.get("output_rate")));
    row.insert("input_rate_bps".to_string(), Value::from(in_bps as i64));
    row.insert("output_rate_bps".to_string(), Value::from(out_bps as i64));
}
