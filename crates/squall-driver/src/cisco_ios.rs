//! Cisco IOS / IOS-XE driver.
//!
//! Handles the field quirks specific to IOS and IOS-XE:
//!   - CPU: templates return `cpu_usage_5_sec` / `cpu_usage_1_min` /
//!     `cpu_usage_5_min`, mapped here to `five_sec_total` / `one_min` /
//!     `five_min`
//!   - Memory: templates return parallel lists (`process_id`,
//!     `process_holding`) that feed the CPU process merge
//!   - Interface detail: bandwidth strings, rate/error int coercion, and
//!     the utilization percentage

use serde_json::Value;
use squall_domain::{CollectionReader, PayloadBody, Row};

use crate::driver::{shared_post_process, VendorDriver};
use crate::helpers::{
    coerce_int_field, filter_cpu_processes, merge_memory_into_processes, parse_bandwidth_kbps,
    parse_rate_bps, to_f64,
};

/// Driver for Cisco IOS and IOS-XE platforms.
///
/// Tested against IOS 15.x and IOS-XE 16.x/17.x output captures.
pub struct CiscoIosDriver;

impl VendorDriver for CiscoIosDriver {
    fn vendor(&self) -> &'static str {
        "cisco_ios"
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
        match collection {
            "cpu" => {
                if let Some(flat) = body.as_flat_mut() {
                    normalize_cpu(flat);
                    filter_cpu_processes(flat);
                    merge_memory_into_processes(flat, store);
                }
                body
            }
            "interface_detail" => {
                if let Some(rows) = body.as_rows_mut() {
                    for row in rows.iter_mut() {
                        enrich_interface_detail(row);
                    }
                }
                body
            }
            _ => shared_post_process(collection, body),
        }
    }
}

/// Map IOS CPU fields to the canonical dashboard keys, accepting both
/// normalize-mapped (`five_sec`) and raw template (`cpu_usage_5_sec`)
/// spellings. The 5-second figure on IOS is a true 5-second average.
fn normalize_cpu(data: &mut Row) {
    if !data.contains_key("five_sec_total") {
        let raw_5s = ["five_sec", "cpu_usage_5_sec"]
            .iter()
            .filter_map(|k| data.get(*k))
            .find_map(to_f64);
        if let Some(v) = raw_5s {
            data.insert("five_sec_total".to_string(), Value::from(v));
        }
    }
    for (canonical, raw) in [("one_min", "cpu_usage_1_min"), ("five_min", "cpu_usage_5_min")] {
        let value = [canonical, raw]
            .iter()
            .filter_map(|k| data.get(*k))
            .find_map(to_f64);
        if let Some(v) = value {
            data.insert(canonical.to_string(), Value::from(v));
        }
    }
}

/// Derive the canonical interface-detail fields: `bandwidth_kbps` from the
/// bandwidth string, int-coerced rates/errors/MTU, and `utilization_pct`
/// as max(in, out) over the configured bandwidth.
fn enrich_interface_detail(row: &mut Row) {
    let bw_kbps = parse_bandwidth_kbps(row.get("bandwidth").or_else(|| row.get("bandwidth_kbps")));
    row.insert("bandwidth_kbps".to_string(), Value::from(bw_kbps as i64));

    let in_bps = parse_rate_bps(row.get("input_rate_bps").or_else(|| row.get("input_rate")));
    let out_bps = parse_rate_bps(row.get("output_rate_bps").or_else(|| row.get("output_rate")));
    row.insert("input_rate_bps".to_string(), Value::from(in_bps as i64));
    row.insert("output_rate_bps".to_string(), Value::from(out_bps as i64));

    for field in ["mtu", "in_errors", "out_errors", "crc_errors"] {
        coerce_int_field(row, field);
    }

    let utilization = if bw_kbps > 0.0 {
        let pct = in_bps.max(out_bps) / (bw_kbps * 1000.0) * 100.0;
        (pct * 10.0).round() / 10.0
    } else {
        0.0
    };
    row.insert("utilization_pct".to_string(), Value::from(utilization));
}
