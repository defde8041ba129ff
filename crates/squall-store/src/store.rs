use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use squall_domain::{
    CollectionMeta, CollectionReader, ConnectionStatus, DeviceInfo, HistorySample, Payload,
};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::event::StateEvent;

/// History ring bound: ~6 hours at a 60 s interval, ~3 at 30 s.
pub const HISTORY_MAX: usize = 360;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Collections that feed the history rings.
const HISTORY_COLLECTIONS: &[&str] = &["cpu", "memory"];

#[derive(Debug, Default)]
struct Inner {
    device_info: DeviceInfo,
    state: HashMap<String, Value>,
    metadata: HashMap<String, CollectionMeta>,
    history: HashMap<String, VecDeque<HistorySample>>,
}

/// Complete state snapshot, deep-copied for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub device: DeviceInfo,
    pub collections: HashMap<String, Value>,
    pub metadata: HashMap<String, CollectionMeta>,
    pub history: HashMap<String, Vec<HistorySample>>,
    pub snapshot_time: DateTime<Utc>,
}

/// Normalized per-device state with change notification.
///
/// Single writer (the device's poll worker) plus concurrent readers (the
/// bridge). All getters return owned deep copies; readers can never observe
/// a partially written payload.
#[derive(Debug)]
pub struct DeviceStateStore {
    inner: RwLock<Inner>,
    events: broadcast::Sender<StateEvent>,
    history_max: usize,
}

impl DeviceStateStore {
    pub fn new(device_info: DeviceInfo) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: RwLock::new(Inner {
                device_info,
                ..Inner::default()
            }),
            events,
            history_max: HISTORY_MAX,
        }
    }

    /// Subscribe to change events. Missed events are recoverable by
    /// re-pulling state.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StateEvent) {
        // No receivers is fine; events are best-effort.
        let _ = self.events.send(event);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ── Device identity ───────────────────────────────────────────────────────

    pub fn device_info(&self) -> DeviceInfo {
        self.read().device_info.clone()
    }

    pub fn set_device_info(&self, info: DeviceInfo) {
        {
            let mut inner = self.write();
            inner.device_info = info;
        }
        self.emit(StateEvent::DeviceInfoChanged);
    }

    /// Record what the SSH session learned about the device.
    pub fn set_detected_identity(&self, detected_hostname: Option<String>, prompt: String) {
        {
            let mut inner = self.write();
            inner.device_info.detected_hostname = detected_hostname;
            inner.device_info.prompt = Some(prompt);
        }
        self.emit(StateEvent::DeviceInfoChanged);
    }

    // ── State write ───────────────────────────────────────────────────────────

    /// Atomically replace a collection's payload and stamp its metadata.
    /// CPU and memory updates also push a headline sample into the history
    /// ring (FIFO, bounded).
    pub fn update(&self, collection: &str, payload: Payload) {
        let value = payload.into_value();
        let now = Utc::now();
        let epoch = epoch_seconds();

        {
            let mut inner = self.write();
            if HISTORY_COLLECTIONS.contains(&collection) {
                let headline = extract_headline(collection, &value);
                let ring = inner.history.entry(collection.to_string()).or_default();
                ring.push_back(HistorySample {
                    timestamp: epoch,
                    data: headline,
                });
                while ring.len() > self.history_max {
                    ring.pop_front();
                }
            }

            inner.state.insert(collection.to_string(), value);
            inner.metadata.insert(
                collection.to_string(),
                CollectionMeta {
                    last_updated: Some(now),
                    timestamp: Some(epoch),
                    success: true,
                    last_error: None,
                    last_error_time: None,
                },
            );
        }

        self.emit(StateEvent::Updated {
            collection: collection.to_string(),
        });
        debug!(collection, "state updated");
    }

    /// Record a collection failure without overwriting the last good data.
    pub fn record_error(&self, collection: &str, error: &str) {
        {
            let mut inner = self.write();
            let meta = inner.metadata.entry(collection.to_string()).or_default();
            meta.success = false;
            meta.last_error = Some(error.to_string());
            meta.last_error_time = Some(Utc::now());
        }
        self.emit(StateEvent::CollectionError {
            collection: collection.to_string(),
            message: error.to_string(),
        });
        warn!(collection, error, "collection error");
    }

    /// Mark one full poll cycle complete.
    pub fn cycle_complete(&self) {
        self.emit(StateEvent::CycleComplete);
    }

    pub fn set_connection_status(&self, status: ConnectionStatus) {
        self.emit(StateEvent::ConnectionStatus(status));
    }

    // ── State read ────────────────────────────────────────────────────────────

    pub fn get(&self, collection: &str) -> Option<Value> {
        self.read().state.get(collection).cloned()
    }

    pub fn get_metadata(&self, collection: &str) -> Option<CollectionMeta> {
        self.read().metadata.get(collection).cloned()
    }

    pub fn get_history(&self, collection: &str) -> Vec<HistorySample> {
        self.read()
            .history
            .get(collection)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Deep-copied snapshot of everything, for the dashboard.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.read();
        let history = HISTORY_COLLECTIONS
            .iter()
            .map(|name| {
                let samples = inner
                    .history
                    .get(*name)
                    .map(|ring| ring.iter().cloned().collect())
                    .unwrap_or_default();
                ((*name).to_string(), samples)
            })
            .collect();

        Snapshot {
            device: inner.device_info.clone(),
            collections: inner.state.clone(),
            metadata: inner.metadata.clone(),
            history,
            snapshot_time: Utc::now(),
        }
    }

    pub fn snapshot_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Reset all collection state (device identity stays).
    pub fn clear(&self) {
        let mut inner = self.write();
        inner.state.clear();
        inner.metadata.clear();
        inner.history.clear();
    }
}

impl CollectionReader for DeviceStateStore {
    fn collection(&self, name: &str) -> Option<Value> {
        self.get(name)
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Headline metrics pushed into the history ring.
fn extract_headline(collection: &str, data: &Value) -> Value {
    match collection {
        "cpu" => json!({
            "five_sec": data.get("five_sec_total").cloned().unwrap_or(json!(0)),
            "one_min": data.get("one_min").cloned().unwrap_or(json!(0)),
            "five_min": data.get("five_min").cloned().unwrap_or(json!(0)),
        }),
        "memory" => json!({
            "used_pct": data.get("used_pct").cloned().unwrap_or(json!(0)),
        }),
        _ => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squall_domain::{PayloadBody, Provenance, Row};

    fn store() -> DeviceStateStore {
        DeviceStateStore::new(DeviceInfo {
            hostname: "r1.lab".into(),
            vendor: "cisco_ios".into(),
            port: 22,
            ..DeviceInfo::default()
        })
    }

    fn flat_payload(pairs: &[(&str, Value)]) -> Payload {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert((*k).to_string(), v.clone());
        }
        Payload::new(
            PayloadBody::Flat(row),
            Provenance {
                parsed_by: "regex".into(),
                template: "inline".into(),
                error: None,
            },
        )
    }

    #[test]
    fn update_then_get_returns_written_payload() {
        let store = store();
        store.update("memory", flat_payload(&[("total", json!(1000)), ("used", json!(400))]));

        let got = store.get("memory").unwrap();
        assert_eq!(got["total"], json!(1000));
        assert_eq!(got["_parsed_by"], json!("regex"));

        let meta = store.get_metadata("memory").unwrap();
        assert!(meta.success);
        assert!(meta.last_error.is_none());
    }

    #[test]
    fn record_error_preserves_last_good_payload() {
        let store = store();
        store.update("cpu", flat_payload(&[("five_sec_total", json!(1.0))]));
        let before = store.get("cpu");

        store.record_error("cpu", "read timeout");

        assert_eq!(store.get("cpu"), before);
        let meta = store.get_metadata("cpu").unwrap();
        assert!(!meta.success);
        assert_eq!(meta.last_error.as_deref(), Some("read timeout"));
        assert!(meta.last_error_time.is_some());
    }

    #[test]
    fn error_before_any_update_leaves_no_payload() {
        let store = store();
        store.record_error("bgp_summary", "empty command output");
        assert!(store.get("bgp_summary").is_none());
        assert!(!store.get_metadata("bgp_summary").unwrap().success);
    }

    #[test]
    fn history_ring_bounded_fifo() {
        let store = store();
        for i in 0..(HISTORY_MAX + 40) {
            store.update("cpu", flat_payload(&[("five_sec_total", json!(i))]));
        }

        let history = store.get_history("cpu");
        assert_eq!(history.len(), HISTORY_MAX);
        // Oldest evicted: the first retained sample is number 40.
        assert_eq!(history[0].data["five_sec"], json!(40));
        assert_eq!(history.last().unwrap().data["five_sec"], json!(HISTORY_MAX + 39));
    }

    #[test]
    fn history_headline_shape() {
        let store = store();
        store.update(
            "memory",
            flat_payload(&[("used_pct", json!(64.9)), ("total", json!(1))]),
        );
        let history = store.get_history("memory");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].data, json!({"used_pct": 64.9}));
    }

    #[test]
    fn snapshot_is_an_independent_copy() {
        let store = store();
        store.update("cpu", flat_payload(&[("five_sec_total", json!(2.0))]));

        let mut snap = store.snapshot();
        snap.collections
            .insert("cpu".into(), json!({"five_sec_total": 99.0}));

        let fresh = store.snapshot();
        assert_eq!(fresh.collections["cpu"]["five_sec_total"], json!(2.0));
    }

    #[test]
    fn snapshot_json_has_wire_shape() {
        let store = store();
        store.update("cpu", flat_payload(&[("five_sec_total", json!(1.0))]));

        let parsed: Value = serde_json::from_str(&store.snapshot_json()).unwrap();
        assert_eq!(parsed["device"]["hostname"], json!("r1.lab"));
        assert!(parsed["collections"]["cpu"].is_object());
        assert!(parsed["metadata"]["cpu"]["success"].as_bool().unwrap());
        assert!(parsed["history"]["cpu"].is_array());
        assert!(parsed["snapshot_time"].is_string());
    }

    #[tokio::test]
    async fn events_emitted_on_update_and_error() {
        let store = store();
        let mut rx = store.subscribe();

        store.update("cpu", flat_payload(&[("five_sec_total", json!(1.0))]));
        store.record_error("memory", "boom");
        store.cycle_complete();

        assert!(matches!(rx.recv().await.unwrap(), StateEvent::Updated { collection } if collection == "cpu"));
        assert!(matches!(rx.recv().await.unwrap(), StateEvent::CollectionError { collection, .. } if collection == "memory"));
        assert!(matches!(rx.recv().await.unwrap(), StateEvent::CycleComplete));
    }

    #[test]
    fn detected_identity_merges_into_device_info() {
        let store = store();
        store.set_detected_identity(Some("edge-r1".into()), "edge-r1#".into());
        let info = store.device_info();
        assert_eq!(info.detected_hostname.as_deref(), Some("edge-r1"));
        assert_eq!(info.prompt.as_deref(), Some("edge-r1#"));
        // Static identity untouched.
        assert_eq!(info.hostname, "r1.lab");
    }
}
