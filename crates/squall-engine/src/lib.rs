//! The per-device poll worker.
//!
//! One engine per device: it owns the SSH session, drives the collection
//! schedule, runs the parser chain, delegates vendor shaping to the driver,
//! and writes results into the state store. Devices run concurrently;
//! within a device everything is strictly serial because the remote shell
//! is stateful.

mod engine;
pub mod error;
mod preflight;
mod schedule;

pub use engine::{EngineConfig, EngineHandle, PollEngine};
pub use error::EngineError;
pub use preflight::{run_preflight, PreflightReport};
pub use schedule::PollSchedule;
