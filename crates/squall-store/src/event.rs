use squall_domain::ConnectionStatus;

/// Change notifications emitted by [`crate::DeviceStateStore`].
///
/// Events carry names, not payloads: a consumer that missed events can
/// always re-pull the latest state, so the channel never needs to buffer
/// full snapshots.
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// A collection's payload was replaced.
    Updated { collection: String },
    /// A poll failed; the last good payload is untouched.
    CollectionError { collection: String, message: String },
    /// One full poll cycle finished.
    CycleComplete,
    /// Device identity (detected hostname, prompt) changed.
    DeviceInfoChanged,
    /// SSH connection state changed.
    ConnectionStatus(ConnectionStatus),
}
