//! The dashboard boundary.
//!
//! The bridge is the only surface the UI sees: synchronous pull methods
//! returning JSON strings, and push events re-broadcast from the state
//! store. Raw in-memory objects never cross this line, so a consumer can
//! not mutate device state. Missed push events are always recoverable by
//! re-pulling the snapshot.

mod bridge;
mod event;

pub use bridge::TelemetryBridge;
pub use event::BridgeEvent;
