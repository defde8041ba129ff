use serde_json::Value;
use squall_domain::{CollectionReader, PayloadBody, Row};

use crate::helpers;

/// Wrapper keys for multi-row collections: collection name → the key the
/// row list lives under in the stored payload.
pub const COLLECTION_LIST_KEYS: &[(&str, &str)] = &[
    ("interfaces", "interfaces"),
    ("interface_detail", "interfaces"),
    ("bgp_summary", "peers"),
    ("neighbors", "neighbors"),
    ("log", "entries"),
    ("environment", "sensors"),
];

/// Collections whose rows collapse to one flat object (first row = summary).
pub const SINGLETON_COLLECTIONS: &[&str] = &["cpu", "memory", "device_info"];

/// Vendor-specific strategy. Implementations override only what differs
/// from the shared behavior.
pub trait VendorDriver: Send + Sync + 'static {
    fn vendor(&self) -> &'static str;

    /// Command to disable CLI pagination. Empty string means the transport
    /// should fire the shotgun list instead.
    fn pagination_command(&self) -> &'static str {
        ""
    }

    /// Convert parsed rows into the payload shape the state store expects.
    fn shape_output(&self, collection: &str, rows: Vec<Row>) -> PayloadBody {
        default_shape_output(collection, rows)
    }

    /// Apply vendor transforms after parsing and shaping. `store` is a
    /// read-only view for cross-collection joins; drivers never mutate
    /// other collections. Must not panic: helpers skip on missing fields
    /// so a partial payload still flows through.
    fn post_process(
        &self,
        collection: &str,
        body: PayloadBody,
        store: &dyn CollectionReader,
    ) -> PayloadBody {
        let _ = store;
        shared_post_process(collection, body)
    }
}

/// Fallback driver for unknown vendors: shotgun pagination, shared
/// transforms only.
pub struct BaseDriver;

impl VendorDriver for BaseDriver {
    fn vendor(&self) -> &'static str {
        "base"
    }
}

// ── Shared shaping ────────────────────────────────────────────────────────────

/// Shape parsed rows for the store.
///
/// Singleton collections flatten to their first row (extra CPU rows become
/// the process list); table collections wrap their rows under the canonical
/// key; unknown collections wrap under `data`. Empty input shapes to an
/// empty flat payload.
pub fn default_shape_output(collection: &str, mut rows: Vec<Row>) -> PayloadBody {
    if rows.is_empty() {
        return PayloadBody::empty();
    }

    if SINGLETON_COLLECTIONS.contains(&collection) {
        let mut flat = rows.remove(0);
        if collection == "cpu" && !rows.is_empty() {
            flat.insert(
                "processes".to_string(),
                Value::Array(rows.into_iter().map(Value::Object).collect()),
            );
        }
        return PayloadBody::Flat(flat);
    }

    let key = COLLECTION_LIST_KEYS
        .iter()
        .find(|(name, _)| *name == collection)
        .map(|(_, key)| *key)
        .unwrap_or("data");

    PayloadBody::Table {
        key: key.to_string(),
        rows,
    }
}

/// Transforms common to every vendor; concrete drivers run this and then
/// add their own.
pub fn shared_post_process(collection: &str, mut body: PayloadBody) -> PayloadBody {
    match collection {
        "memory" => {
            if let Some(flat) = body.as_flat_mut() {
                helpers::compute_memory_pct(flat);
            }
        }
        "log" => {
            if let Some(rows) = body.as_rows_mut() {
                let processed = helpers::post_process_log(std::mem::take(rows), 50);
                *rows = processed;
            }
        }
        "bgp_summary" => {
            if let Some(rows) = body.as_rows_mut() {
                helpers::normalize_bgp_peers(rows);
            }
        }
        _ => {}
    }
    body
}
