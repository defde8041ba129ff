use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed row: ordered field name → value, as produced by the parser chain.
///
/// Values start life as strings and become numeric/bool after schema
/// coercion. Ordering is preserved so payloads serialize the way the
/// device printed them.
pub type Row = serde_json::Map<String, Value>;

// ── Vendor tag ────────────────────────────────────────────────────────────────

/// Platform identifier (`cisco_ios`, `arista_eos`, …).
///
/// Tags are open-ended strings rather than a closed enum: collection configs
/// and driver registrations are keyed by tag, and an unknown tag degrades to
/// the base driver instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VendorTag(pub String);

impl VendorTag {
    pub fn new(s: impl Into<String>) -> Self {
        VendorTag(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The platform-suffix fallback chain, most specific first.
    ///
    /// `cisco_ios_xe` yields `["cisco_ios_xe", "cisco_ios", "cisco"]`. Both
    /// the collection catalog and the driver registry resolve through this
    /// chain, so an `_xe` platform without its own config inherits the base
    /// platform's.
    pub fn fallbacks(&self) -> Vec<VendorTag> {
        let mut chain = vec![self.clone()];
        let mut current = self.0.as_str();
        while let Some(idx) = current.rfind('_') {
            current = &current[..idx];
            chain.push(VendorTag::new(current));
        }
        chain
    }

    pub const KNOWN: &'static [&'static str] = &[
        "cisco_ios",
        "cisco_ios_xe",
        "cisco_nxos",
        "arista_eos",
        "juniper_junos",
    ];
}

impl std::fmt::Display for VendorTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Device identity ───────────────────────────────────────────────────────────

/// What the operator asked us to poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    pub hostname: String,
    pub port: u16,
    /// Human-facing label; defaults to the hostname.
    pub display_name: String,
    pub vendor: VendorTag,
    pub tags: Vec<String>,
}

impl DeviceTarget {
    pub fn new(hostname: impl Into<String>, vendor: VendorTag) -> Self {
        let hostname = hostname.into();
        Self {
            display_name: hostname.clone(),
            hostname,
            port: 22,
            vendor,
            tags: Vec::new(),
        }
    }
}

/// Device identity as exposed in snapshots. Static fields come from the
/// target; `detected_hostname` and `prompt` are filled in after the SSH
/// session learns them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    pub vendor: String,
    pub username: String,
    pub display_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Hostname parsed out of the detected prompt, if any.
    pub detected_hostname: Option<String>,
    /// The auto-detected CLI prompt used as the expect token.
    pub prompt: Option<String>,
}

// ── Credentials ───────────────────────────────────────────────────────────────

/// Exactly one authentication method per credential set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Password(String),
    KeyFile {
        path: String,
        passphrase: Option<String>,
    },
    /// PEM key material held in memory (e.g. handed over by a vault).
    KeyData {
        pem: String,
        passphrase: Option<String>,
    },
    Agent,
}

/// One hop of a jump-host chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpHost {
    pub hostname: String,
    pub port: u16,
    pub username: Option<String>,
    pub auth: Option<AuthMethod>,
    /// Hardware-token prompt expected during this hop's auth.
    pub requires_touch: bool,
}

/// Resolved SSH credentials, ready for the transport.
///
/// This is the output contract of whatever credential source is in play;
/// the transport consumes it and does not care where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshCredentials {
    pub username: String,
    pub auth: AuthMethod,
    pub jump: Option<JumpHost>,
}

impl SshCredentials {
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth: AuthMethod::Password(password.into()),
            jump: None,
        }
    }

    pub fn key_file(username: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            auth: AuthMethod::KeyFile {
                path: path.into(),
                passphrase: None,
            },
            jump: None,
        }
    }
}

// ── Payload ───────────────────────────────────────────────────────────────────

/// Which parser produced a payload, and with what template.
///
/// `parsed_by == "none"` always travels with an error message; a successful
/// parse never carries one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub parsed_by: String,
    pub template: String,
    pub error: Option<String>,
}

impl Provenance {
    pub fn none(error: impl Into<String>) -> Self {
        Self {
            parsed_by: "none".into(),
            template: String::new(),
            error: Some(error.into()),
        }
    }
}

/// The shape of a collection's data.
///
/// Singleton collections (cpu, memory, device_info) flatten to one object;
/// table collections wrap their rows under a canonical key (`interfaces`,
/// `peers`, …). The enum keeps the distinction explicit instead of sniffing
/// free-form maps downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PayloadBody {
    Flat(Row),
    Table { key: String, rows: Vec<Row> },
}

impl PayloadBody {
    pub fn empty() -> Self {
        PayloadBody::Flat(Row::new())
    }

    pub fn as_flat(&self) -> Option<&Row> {
        match self {
            PayloadBody::Flat(row) => Some(row),
            PayloadBody::Table { .. } => None,
        }
    }

    pub fn as_flat_mut(&mut self) -> Option<&mut Row> {
        match self {
            PayloadBody::Flat(row) => Some(row),
            PayloadBody::Table { .. } => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            PayloadBody::Table { rows, .. } => Some(rows),
            PayloadBody::Flat(_) => None,
        }
    }

    pub fn as_rows_mut(&mut self) -> Option<&mut Vec<Row>> {
        match self {
            PayloadBody::Table { rows, .. } => Some(rows),
            PayloadBody::Flat(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PayloadBody::Flat(row) => row.is_empty(),
            PayloadBody::Table { rows, .. } => rows.is_empty(),
        }
    }
}

/// A collection payload plus its parse provenance. This is the unit the
/// state store replaces atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub body: PayloadBody,
    pub provenance: Provenance,
}

impl Payload {
    pub fn new(body: PayloadBody, provenance: Provenance) -> Self {
        Self { body, provenance }
    }

    /// Render the payload for storage/wire delivery: one JSON object with
    /// `_parsed_by` / `_template` / `_error` co-resident with the data.
    pub fn into_value(self) -> Value {
        let mut obj = match self.body {
            PayloadBody::Flat(row) => row,
            PayloadBody::Table { key, rows } => {
                let mut m = Row::new();
                m.insert(key, Value::Array(rows.into_iter().map(Value::Object).collect()));
                m
            }
        };
        obj.insert("_parsed_by".into(), Value::String(self.provenance.parsed_by));
        obj.insert("_template".into(), Value::String(self.provenance.template));
        if let Some(err) = self.provenance.error {
            obj.insert("_error".into(), Value::String(err));
        }
        Value::Object(obj)
    }
}

// ── Collection metadata & history ─────────────────────────────────────────────

/// Per-collection bookkeeping. A failed poll only touches this; the last
/// good payload survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionMeta {
    pub last_updated: Option<DateTime<Utc>>,
    /// Seconds since the epoch of the last successful update.
    pub timestamp: Option<f64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error_time: Option<DateTime<Utc>>,
}

/// One history ring entry: headline metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub timestamp: f64,
    pub data: Value,
}

// ── Driver → store read access ────────────────────────────────────────────────

/// Read-only view of the state store handed to drivers for cross-collection
/// joins (e.g. merging memory holdings into CPU processes). Drivers can read
/// any collection but can never mutate one.
pub trait CollectionReader: Send + Sync {
    /// Current payload value for a collection, if one has been stored.
    fn collection(&self, name: &str) -> Option<Value>;
}

/// An empty reader for contexts with no store (tests, preflight).
pub struct NoCollections;

impl CollectionReader for NoCollections {
    fn collection(&self, _name: &str) -> Option<Value> {
        None
    }
}

// ── Connection status ─────────────────────────────────────────────────────────

/// Connection state as surfaced to the dashboard status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Connected => write!(f, "connected"),
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Error(msg) => write!(f, "error:{}", msg),
        }
    }
}

// ── Field types ───────────────────────────────────────────────────────────────

/// Canonical field type from a collection's `_schema.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Str,
}

impl FieldType {
    pub fn parse(s: &str) -> Option<FieldType> {
        match s {
            "int" => Some(FieldType::Int),
            "float" => Some(FieldType::Float),
            "bool" => Some(FieldType::Bool),
            "str" => Some(FieldType::Str),
            _ => None,
        }
    }
}
