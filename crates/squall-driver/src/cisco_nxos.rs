//! Cisco NX-OS driver.
//!
//! NX-OS reports CPU via `show system resources` as user/kernel/idle
//! percentages rather than the IOS 5s/1m/5m triplet, so the totals here are
//! derived and instantaneous.

use serde_json::Value;
use squall_domain::{CollectionReader, PayloadBody, Row};

use crate::driver::{shared_post_process, VendorDriver};
use crate::helpers::{filter_cpu_processes, to_f64};

pub struct CiscoNxosDriver;

impl VendorDriver for CiscoNxosDriver {
    fn vendor(&self) -> &'static str {
        "cisco_nxos"
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
                    normalize_cpu(flat);
                    filter_cpu_processes(flat);
                }
                body
            }
            _ => shared_post_process(collection, body),
        }
    }
}

/// Derive total CPU from `idle_pct` (or `user + system`). The device gives
/// one instantaneous reading, mirrored into all three headline slots;
/// `five_sec_is_instantaneous` tells the dashboard what it is looking at.
pub(crate) fn normalize_cpu(data: &mut Row) {
    let total = if let Some(idle) = data.get("idle_pct").and_then(to_f64) {
        Some(((100.0 - idle) * 10.0).round() / 10.0)
    } else if let Some(user) = data.get("user_pct").and_then(to_f64) {
        let system = data.get("system_pct").and_then(to_f64).unwrap_or(0.0);
        Some(((user + system) * 10.0).round() / 10.0)
    } else {
        None
    };

    if let Some(total) = total {
        for key in ["five_sec_total", "one_min", "five_min"] {
            if !data.contains_key(key) {
                data.insert(key.to_string(), Value::from(total));
            }
        }
        data.insert("five_sec_is_instantaneous".to_string(), Value::Bool(true));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use squall_domain::NoCollections;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn total_from_idle() {
        let driver = CiscoNxosDriver;
        let body = PayloadBody::Flat(row(&[("idle_pct", json!("92.5"))]));
        let out = driver.post_process("cpu", body, &NoCollections);
        let flat = out.as_flat().unwrap();
        assert_eq!(flat["five_sec_total"], json!(7.5));
        assert_eq!(flat["one_min"], json!(7.5));
        assert_eq!(flat["five_sec_is_instantaneous"], json!(true));
    }

    #[test]
    fn total_from_user_plus_system() {
        let driver = CiscoNxosDriver;
        let body = PayloadBody::Flat(row(&[
            ("user_pct", json!("3.0")),
            ("system_pct", json!("2.5")),
        ]));
        let out = driver.post_process("cpu", body, &NoCollections);
        assert_eq!(out.as_flat().unwrap()["five_sec_total"], json!(5.5));
    }

    #[test]
    fn existing_headline_values_not_overwritten() {
        let driver = CiscoNxosDriver;
        let body = PayloadBody::Flat(row(&[
            ("idle_pct", json!("90")),
            ("five_sec_total", json!(42.0)),
        ]));
        let out = driver.post_process("cpu", body, &NoCollections);
        assert_eq!(out.as_flat().unwrap()["five_sec_total"], json!(42.0));
    }
}
