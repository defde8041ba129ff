//! Interactive SSH transport for network devices.
//!
//! Opens a shell channel (never exec — most network OSes reject it),
//! auto-detects the CLI prompt, filters ANSI sequences out of every read,
//! disables pagination, and runs commands by waiting for the prompt to
//! reappear. Legacy mode widens the KEX/cipher/host-key offer for equipment
//! that never learned modern crypto.

pub mod ansi;
mod client;
pub mod error;
pub mod prompt;

pub use ansi::filter_ansi;
pub use client::{SshClient, SshClientConfig, PAGINATION_SHOTGUN};
pub use error::SshError;
