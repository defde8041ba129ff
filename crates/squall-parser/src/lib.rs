//! Ordered fallback parser for CLI output: TextFSM → line templates → regex.
//!
//! First parser that returns structured data wins. Every result carries
//! provenance (`_parsed_by`, `_template`, `_error`), and every attempt —
//! template resolution, parse, normalize, coerce — is recorded in a
//! [`ParseTrace`] for diagnostics. The chain never fails: exhaustion is a
//! returned `parsed_by == "none"` with an error message.

mod chain;
mod line_template;
mod regex_parser;
mod resolve;
mod sanitize;
mod textfsm;
pub mod trace;

pub use chain::{Capabilities, ParserChain};
pub use resolve::TemplateResolver;
pub use sanitize::sanitize_cli_output;
pub use trace::{ParseTrace, ParseTraceStore, TraceRecord, TraceSummary};
