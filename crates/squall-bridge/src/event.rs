use serde::Serialize;

/// Push signals delivered to the dashboard. The serialized names are part
/// of the API contract.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum BridgeEvent {
    #[serde(rename = "stateChanged")]
    StateChanged {
        collection: String,
        /// The collection payload, pre-serialized.
        json: String,
    },
    #[serde(rename = "cycleComplete")]
    CycleComplete,
    #[serde(rename = "deviceInfoChanged")]
    DeviceInfoChanged {
        /// Device identity, pre-serialized.
        json: String,
    },
    #[serde(rename = "connectionStatus")]
    ConnectionStatus {
        /// `"connected"`, `"disconnected"`, or `"error:<message>"`.
        status: String,
    },
}

impl BridgeEvent {
    /// The wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::StateChanged { .. } => "stateChanged",
            BridgeEvent::CycleComplete => "cycleComplete",
            BridgeEvent::DeviceInfoChanged { .. } => "deviceInfoChanged",
            BridgeEvent::ConnectionStatus { .. } => "connectionStatus",
        }
    }
}
