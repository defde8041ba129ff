//! Shared post-processing transforms, usable by any vendor driver.
//!
//! Every helper is defensive: a missing or malformed field means the
//! transform is skipped for that row, never an error. Values the device
//! reported but we cannot interpret are kept as-is.

use serde_json::Value;
use squall_domain::{CollectionReader, Row};

// ── Numeric coercion ──────────────────────────────────────────────────────────

/// Parse a JSON value as f64, tolerating `%` and `,` decorations.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(['%', ','], "").parse::<f64>().ok(),
        _ => None,
    }
}

/// The first key whose value parses as a number.
pub fn first_numeric(row: &Row, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| row.get(*k))
        .find_map(to_f64)
}

/// Like [`first_numeric`], but each key carries a byte multiplier so
/// kilobyte/megabyte-denominated fields (`total_kb`, `memory_total`)
/// compare on equal footing.
fn first_sized(row: &Row, keys: &[(&str, f64)]) -> Option<f64> {
    keys.iter()
        .find_map(|(k, scale)| row.get(*k).and_then(to_f64).map(|v| v * scale))
}

/// Coerce a named field to an integer in place; absent or unparseable
/// fields become 0 (the dashboard contract wants numbers, never null).
pub fn coerce_int_field(row: &mut Row, key: &str) {
    let value = row.get(key).and_then(to_f64).unwrap_or(0.0);
    row.insert(key.to_string(), Value::from(value as i64));
}

// ── Memory ────────────────────────────────────────────────────────────────────

/// Compute `used_pct` (plus display strings) from whatever memory fields
/// are present. Tries canonical names first, then raw template names; the
/// normalize map should already have renamed vendor fields, but unmapped
/// ones are handled too.
pub fn compute_memory_pct(data: &mut Row) {
    let total = first_sized(data, &[
        ("total_bytes", 1.0),
        ("total_kb", 1024.0),
        ("total_mb", 1024.0 * 1024.0),
        ("total", 1.0),
        ("memory_total", 1024.0),
    ]);
    let used = first_sized(data, &[
        ("used_bytes", 1.0),
        ("used_kb", 1024.0),
        ("used_mb", 1024.0 * 1024.0),
        ("used", 1.0),
        ("memory_used", 1024.0),
    ]);
    let free = first_sized(data, &[
        ("free_bytes", 1.0),
        ("free", 1.0),
        ("free_kb", 1024.0),
        ("memory_free", 1024.0),
    ]);

    let used = match (total, used, free) {
        (Some(t), None, Some(f)) => Some(t - f),
        (_, u, _) => u,
    };

    if let (Some(total), Some(used)) = (total, used) {
        if total > 0.0 {
            let pct = (used / total * 100.0 * 10.0).round() / 10.0;
            data.insert("used_pct".to_string(), Value::from(pct));
            data.insert("total_display".to_string(), Value::String(display_bytes(total)));
            data.insert("used_display".to_string(), Value::String(display_bytes(used)));
        }
    }
}

/// Human-readable byte count by magnitude. Pools in the hundreds of MB
/// read as fractional GB.
pub fn display_bytes(bytes: f64) -> String {
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const KB: f64 = 1024.0;
    if bytes > 100_000_000.0 {
        format!("{:.1} GB", bytes / GB)
    } else if bytes > 1_000_000.0 {
        format!("{:.1} MB", bytes / MB)
    } else if bytes > 1_000.0 {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{:.0} B", bytes)
    }
}

/// Parse a memory size that may be unit-suffixed (`123K`, `1.5M`, `2G`) or
/// a bare kilobyte count, returning bytes.
pub fn parse_mem_size_bytes(value: &Value) -> Option<f64> {
    let text = match value {
        Value::Number(n) => return n.as_f64().map(|v| v * 1024.0),
        Value::String(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    let (num_part, factor) = match text.chars().last()? {
        'K' | 'k' => (&text[..text.len() - 1], 1024.0),
        'M' | 'm' => (&text[..text.len() - 1], 1024.0 * 1024.0),
        'G' | 'g' => (&text[..text.len() - 1], 1024.0 * 1024.0 * 1024.0),
        'B' | 'b' => (&text[..text.len() - 1], 1.0),
        _ => (text, 1024.0), // bare values are kilobytes
    };
    num_part.trim().replace(',', "").parse::<f64>().ok().map(|v| v * factor)
}

// ── CPU processes ─────────────────────────────────────────────────────────────

/// Filter idle processes and add the short field aliases the dashboard
/// expects (`pid`, `name`, `cpu_pct`, `five_sec`, `cpu_1min`, `cpu_5min`).
///
/// A process whose 5-second figure cannot be parsed is kept rather than
/// silently discarded.
pub fn filter_cpu_processes(data: &mut Row) {
    let Some(Value::Array(processes)) = data.get("processes").cloned() else {
        return;
    };

    let mut active = Vec::new();
    for proc_value in processes {
        let Value::Object(mut proc) = proc_value else {
            continue;
        };

        let cpu_5s = ["process_cpu_usage_5_sec", "cpu_pct", "five_sec"]
            .iter()
            .filter_map(|k| proc.get(*k))
            .find_map(to_f64);

        match cpu_5s {
            Some(v) if v > 0.0 => {
                let pid = proc
                    .get("pid")
                    .or_else(|| proc.get("process_pid"))
                    .cloned()
                    .unwrap_or(Value::String(String::new()));
                let name = proc
                    .get("name")
                    .or_else(|| proc.get("process_name"))
                    .cloned()
                    .unwrap_or(Value::String(String::new()));
                proc.insert("pid".to_string(), pid);
                proc.insert("name".to_string(), name);
                proc.insert("cpu_pct".to_string(), Value::from(v));
                proc.insert("five_sec".to_string(), Value::from(v));

                let one_min = ["cpu_1min", "process_cpu_usage_1_min"]
                    .iter()
                    .filter_map(|k| proc.get(*k))
                    .find_map(to_f64)
                    .unwrap_or(0.0);
                let five_min = ["cpu_5min", "process_cpu_usage_5_min"]
                    .iter()
                    .filter_map(|k| proc.get(*k))
                    .find_map(to_f64)
                    .unwrap_or(0.0);
                proc.insert("cpu_1min".to_string(), Value::from(one_min));
                proc.insert("cpu_5min".to_string(), Value::from(five_min));

                active.push(Value::Object(proc));
            }
            Some(_) => {} // idle, drop
            None => active.push(Value::Object(proc)),
        }
    }

    data.insert("processes".to_string(), Value::Array(active));
}

/// Merge per-process memory holdings from the memory collection into CPU
/// process rows by PID.
///
/// The memory template reports parallel lists (`process_id`,
/// `process_holding`); each CPU process matching a PID gains a `holding`
/// byte count.
pub fn merge_memory_into_processes(data: &mut Row, store: &dyn CollectionReader) {
    let Some(Value::Array(mut processes)) = data.get("processes").cloned() else {
        return;
    };
    let Some(mem) = store.collection("memory") else {
        return;
    };

    let pids = mem.get("process_id").and_then(Value::as_array);
    let holdings = mem.get("process_holding").and_then(Value::as_array);
    let (Some(pids), Some(holdings)) = (pids, holdings) else {
        return;
    };
    if pids.is_empty() || pids.len() != holdings.len() {
        return;
    }

    let lookup: std::collections::HashMap<String, i64> = pids
        .iter()
        .zip(holdings.iter())
        .filter_map(|(pid, holding)| {
            let pid = value_as_string(pid);
            let holding = to_f64(holding)? as i64;
            Some((pid, holding))
        })
        .collect();

    for proc in processes.iter_mut() {
        let Value::Object(proc) = proc else { continue };
        let pid = proc
            .get("pid")
            .or_else(|| proc.get("process_pid"))
            .map(value_as_string)
            .unwrap_or_default();
        if let Some(holding) = lookup.get(&pid) {
            proc.insert("holding".to_string(), Value::from(*holding));
        }
    }

    data.insert("processes".to_string(), Value::Array(processes));
}

fn value_as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── BGP ───────────────────────────────────────────────────────────────────────

/// Normalize BGP peer state across vendors.
///
/// `state_pfx` is either a state string ("Idle", "Active") or a number — a
/// prefix count, which means the session is established.
pub fn normalize_bgp_peers(peers: &mut [Row]) {
    for peer in peers.iter_mut() {
        let state_pfx = peer.get("state_pfx").map(value_as_string).unwrap_or_default();
        match state_pfx.trim().parse::<i64>() {
            Ok(count) => {
                peer.insert("state".to_string(), Value::String("Established".into()));
                peer.insert("prefixes_rcvd".to_string(), Value::from(count));
            }
            Err(_) => {
                let state = if state_pfx.is_empty() {
                    "Unknown".to_string()
                } else {
                    state_pfx
                };
                peer.insert("state".to_string(), Value::String(state));
                peer.insert("prefixes_rcvd".to_string(), Value::from(0));
            }
        }
    }
}

// ── Syslog ────────────────────────────────────────────────────────────────────

/// Post-process log entries: assemble timestamps from month/day/time
/// components, join message lists, coerce severity to int, reverse to
/// newest-first, truncate.
pub fn post_process_log(mut entries: Vec<Row>, max_entries: usize) -> Vec<Row> {
    for entry in entries.iter_mut() {
        if !entry.contains_key("timestamp") && entry.contains_key("month") {
            let mut parts: Vec<String> = ["month", "day", "time"]
                .iter()
                .filter_map(|k| entry.get(*k))
                .map(value_as_string)
                .filter(|s| !s.is_empty())
                .collect();
            if let Some(tz) = entry.get("timezone").map(value_as_string) {
                if !tz.is_empty() {
                    parts.push(tz);
                }
            }
            entry.insert("timestamp".to_string(), Value::String(parts.join(" ")));
        }

        if let Some(Value::Array(msg)) = entry.get("message").cloned() {
            let joined = msg
                .iter()
                .map(value_as_string)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            entry.insert("message".to_string(), Value::String(joined));
        }

        if let Some(sev) = entry.get("severity").and_then(to_f64) {
            entry.insert("severity".to_string(), Value::from(sev as i64));
        }
    }

    entries.reverse();
    entries.truncate(max_entries);
    entries
}

// ── Rates & bandwidth ─────────────────────────────────────────────────────────

/// Parse an interface rate that is either a bare bits-per-second integer or
/// a unit-suffixed string like `"1.23 Mbps"`. Missing or unparseable is 0,
/// never null.
pub fn parse_rate_bps(value: Option<&Value>) -> f64 {
    let Some(value) = value else { return 0.0 };
    if let Some(n) = value.as_f64() {
        return n;
    }
    let Value::String(s) = value else { return 0.0 };
    let text = s.trim();
    if text.is_empty() {
        return 0.0;
    }

    let lowered = text.to_lowercase();
    let (number, unit): (String, String) = lowered
        .chars()
        .partition(|c| c.is_ascii_digit() || *c == '.' || *c == ',');
    let Ok(n) = number.replace(',', "").parse::<f64>() else {
        return 0.0;
    };

    let multiplier = match unit.trim() {
        "" | "bps" | "bits/sec" => 1.0,
        "kbps" | "kbit/sec" => 1e3,
        "mbps" | "mbit/sec" => 1e6,
        "gbps" | "gbit/sec" => 1e9,
        _ => 1.0,
    };
    n * multiplier
}

/// Parse an IOS bandwidth string (`"10000 Kbit/sec"`, `"10000 Kbit"`, or a
/// bare kbps number) into kilobits per second. Missing is 0.
pub fn parse_bandwidth_kbps(value: Option<&Value>) -> f64 {
    let Some(value) = value else { return 0.0 };
    if let Some(n) = value.as_f64() {
        return n;
    }
    let Value::String(s) = value else { return 0.0 };
    let lowered = s.trim().to_lowercase();
    if lowered.is_empty() {
        return 0.0;
    }

    let number: String = lowered
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let Ok(n) = number.parse::<f64>() else { return 0.0 };

    if lowered.contains("gbit") {
        n * 1e6
    } else if lowered.contains("mbit") {
        n * 1e3
    } else {
        // Kbit or bare: IOS reports BW in kbps.
        n
    }
}
