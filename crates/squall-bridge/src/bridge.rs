use std::sync::Arc;

use squall_store::{DeviceStateStore, StateEvent};
use tokio::sync::broadcast;
use tracing::debug;

use crate::event::BridgeEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Bridge between the state store and the dashboard.
///
/// Pull methods return JSON strings; push events arrive on the broadcast
/// channel returned by [`subscribe`](TelemetryBridge::subscribe). A spawned
/// forwarder task converts store events into bridge events, attaching the
/// payload JSON so the UI never touches store internals.
pub struct TelemetryBridge {
    store: Arc<DeviceStateStore>,
    events: broadcast::Sender<BridgeEvent>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl TelemetryBridge {
    pub fn new(store: Arc<DeviceStateStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let forwarder = tokio::spawn(forward_events(
            store.clone(),
            store.subscribe(),
            events.clone(),
        ));
        Self {
            store,
            events,
            forwarder,
        }
    }

    /// Subscribe to push events. A lagging receiver can always catch up by
    /// re-pulling [`get_snapshot`](Self::get_snapshot).
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.events.subscribe()
    }

    // ── Pull methods (all JSON strings) ───────────────────────────────────────

    /// Complete state snapshot. Called by the dashboard on init.
    pub fn get_snapshot(&self) -> String {
        self.store.snapshot_json()
    }

    /// One collection's payload, `{}` if never polled.
    pub fn get_collection(&self, collection: &str) -> String {
        self.store
            .get(collection)
            .and_then(|v| serde_json::to_string(&v).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    /// History samples for a collection, `[]` if none.
    pub fn get_history(&self, collection: &str) -> String {
        serde_json::to_string(&self.store.get_history(collection))
            .unwrap_or_else(|_| "[]".to_string())
    }

    /// Device identity.
    pub fn get_device_info(&self) -> String {
        serde_json::to_string(&self.store.device_info()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Collection metadata (timestamps, errors), `{}` if never polled.
    pub fn get_metadata(&self, collection: &str) -> String {
        self.store
            .get_metadata(collection)
            .and_then(|m| serde_json::to_string(&m).ok())
            .unwrap_or_else(|| "{}".to_string())
    }
}

impl Drop for TelemetryBridge {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

async fn forward_events(
    store: Arc<DeviceStateStore>,
    mut rx: broadcast::Receiver<StateEvent>,
    tx: broadcast::Sender<BridgeEvent>,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                debug!(missed, "bridge forwarder lagged; consumers should re-pull");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let bridge_event = match event {
            StateEvent::Updated { collection } => {
                let json = store
                    .get(&collection)
                    .and_then(|v| serde_json::to_string(&v).ok())
                    .unwrap_or_else(|| "{}".to_string());
                BridgeEvent::StateChanged { collection, json }
            }
            StateEvent::CollectionError { collection, message } => BridgeEvent::StateChanged {
                collection: format!("error:{}", collection),
                json: serde_json::json!({ "error": message }).to_string(),
            },
            StateEvent::CycleComplete => BridgeEvent::CycleComplete,
            StateEvent::DeviceInfoChanged => {
                let json = serde_json::to_string(&store.device_info())
                    .unwrap_or_else(|_| "{}".to_string());
                BridgeEvent::DeviceInfoChanged { json }
            }
            StateEvent::ConnectionStatus(status) => BridgeEvent::ConnectionStatus {
                status: status.to_string(),
            },
        };

        // No subscribers yet is fine.
        let _ = tx.send(bridge_event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use squall_domain::{
        ConnectionStatus, DeviceInfo, Payload, PayloadBody, Provenance, Row,
    };

    fn store() -> Arc<DeviceStateStore> {
        Arc::new(DeviceStateStore::new(DeviceInfo {
            hostname: "r1".into(),
            vendor: "arista_eos".into(),
            ..DeviceInfo::default()
        }))
    }

    fn payload(pairs: &[(&str, Value)]) -> Payload {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert((*k).to_string(), v.clone());
        }
        Payload::new(
            PayloadBody::Flat(row),
            Provenance {
                parsed_by: "textfsm".into(),
                template: "t".into(),
                error: None,
            },
        )
    }

    #[tokio::test]
    async fn pull_methods_return_json() {
        let store = store();
        let bridge = TelemetryBridge::new(store.clone());
        store.update("cpu", payload(&[("five_sec_total", json!(3.0))]));

        let snapshot: Value = serde_json::from_str(&bridge.get_snapshot()).unwrap();
        assert_eq!(snapshot["device"]["hostname"], json!("r1"));

        let cpu: Value = serde_json::from_str(&bridge.get_collection("cpu")).unwrap();
        assert_eq!(cpu["five_sec_total"], json!(3.0));

        assert_eq!(bridge.get_collection("bgp_summary"), "{}");
        assert_eq!(bridge.get_history("memory"), "[]");

        let meta: Value = serde_json::from_str(&bridge.get_metadata("cpu")).unwrap();
        assert_eq!(meta["success"], json!(true));
    }

    #[tokio::test]
    async fn state_updates_forward_as_state_changed() {
        let store = store();
        let bridge = TelemetryBridge::new(store.clone());
        let mut rx = bridge.subscribe();

        store.update("memory", payload(&[("used_pct", json!(42.0))]));

        let event = rx.recv().await.unwrap();
        match event {
            BridgeEvent::StateChanged { collection, json } => {
                assert_eq!(collection, "memory");
                let v: Value = serde_json::from_str(&json).unwrap();
                assert_eq!(v["used_pct"], json!(42.0));
            }
            other => panic!("expected stateChanged, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connection_status_renders_wire_strings() {
        let store = store();
        let bridge = TelemetryBridge::new(store.clone());
        let mut rx = bridge.subscribe();

        store.set_connection_status(ConnectionStatus::Connected);
        store.set_connection_status(ConnectionStatus::Error("auth failed".into()));

        match rx.recv().await.unwrap() {
            BridgeEvent::ConnectionStatus { status } => assert_eq!(status, "connected"),
            other => panic!("unexpected {:?}", other),
        }
        match rx.recv().await.unwrap() {
            BridgeEvent::ConnectionStatus { status } => assert_eq!(status, "error:auth failed"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn collection_errors_forward_with_error_prefix() {
        let store = store();
        let bridge = TelemetryBridge::new(store.clone());
        let mut rx = bridge.subscribe();

        store.record_error("bgp_summary", "all parsers failed");

        match rx.recv().await.unwrap() {
            BridgeEvent::StateChanged { collection, json } => {
                assert_eq!(collection, "error:bgp_summary");
                assert!(json.contains("all parsers failed"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
