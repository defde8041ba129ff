use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use squall_domain::{FieldType, VendorTag};
use tracing::{debug, error};

use crate::error::ConfigError;
use crate::raw::{RawCollection, RawParser, RawSchema};

/// Default polling intervals in seconds, used when a collection YAML omits
/// `interval`.
pub fn default_interval(collection: &str) -> u64 {
    match collection {
        "cpu" | "memory" | "processes" | "log" => 30,
        "interfaces" | "interface_detail" | "bgp_summary" => 60,
        "neighbors" => 300,
        "environment" => 120,
        _ => 60,
    }
}

// ── Typed descriptor ──────────────────────────────────────────────────────────

/// One parser attempt in a collection's chain, tried in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParserSpec {
    TextFsm {
        templates: Vec<String>,
    },
    Ttp {
        templates: Vec<String>,
    },
    Regex {
        pattern: String,
        flags: String,
        groups: HashMap<String, usize>,
    },
}

impl ParserSpec {
    /// Template names referenced by this spec (empty for the regex parser).
    pub fn templates(&self) -> &[String] {
        match self {
            ParserSpec::TextFsm { templates } | ParserSpec::Ttp { templates } => templates,
            ParserSpec::Regex { .. } => &[],
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParserSpec::TextFsm { .. } => "textfsm",
            ParserSpec::Ttp { .. } => "ttp",
            ParserSpec::Regex { .. } => "regex",
        }
    }
}

/// A loaded `(collection, vendor)` descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSpec {
    pub command: String,
    pub interval: Option<u64>,
    pub parsers: Vec<ParserSpec>,
    /// canonical → parser-produced; inverted at apply time.
    pub normalize: HashMap<String, String>,
}

/// Canonical field types from `_schema.yaml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub fields: HashMap<String, FieldType>,
}

impl Schema {
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// Loads collection descriptors and schemas from the `collections/` directory.
///
/// Directory layout:
/// ```text
/// collections/
///   interfaces/
///     _schema.yaml
///     cisco_ios.yaml
///     arista_eos.yaml
///   cpu/
///     _schema.yaml
///     ...
/// ```
///
/// Descriptors are loaded lazily and cached for the catalog's lifetime. A
/// vendor without its own YAML falls back along the platform suffix chain
/// (`cisco_ios_xe` → `cisco_ios`).
#[derive(Debug)]
pub struct CollectionCatalog {
    dir: PathBuf,
    specs: RwLock<HashMap<String, Option<CollectionSpec>>>,
    schemas: RwLock<HashMap<String, Option<Schema>>>,
}

impl CollectionCatalog {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            specs: RwLock::new(HashMap::new()),
            schemas: RwLock::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the descriptor for `(collection, vendor)`, walking the vendor
    /// fallback chain. Returns `None` if no YAML exists for any tag in the
    /// chain, or the file fails to parse (logged, not fatal).
    pub fn spec(&self, collection: &str, vendor: &VendorTag) -> Option<CollectionSpec> {
        let cache_key = format!("{}/{}", collection, vendor);
        {
            let cache = self.specs.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = cache.get(&cache_key) {
                return cached.clone();
            }
        }

        let loaded = self.load_spec(collection, vendor);
        self.specs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(cache_key, loaded.clone());
        loaded
    }

    fn load_spec(&self, collection: &str, vendor: &VendorTag) -> Option<CollectionSpec> {
        for tag in vendor.fallbacks() {
            let path = self.dir.join(collection).join(format!("{}.yaml", tag));
            if !path.exists() {
                continue;
            }
            match read_collection(&path) {
                Ok(spec) => {
                    debug!(collection, vendor = %tag, path = %path.display(), "loaded collection config");
                    return Some(spec);
                }
                Err(e) => {
                    error!(collection, path = %path.display(), error = %e, "failed to load collection config");
                    return None;
                }
            }
        }
        debug!(collection, vendor = %vendor, "no collection config");
        None
    }

    /// Load the canonical schema for a collection, if `_schema.yaml` exists.
    pub fn schema(&self, collection: &str) -> Option<Schema> {
        {
            let cache = self.schemas.read().unwrap_or_else(|e| e.into_inner());
            if let Some(cached) = cache.get(collection) {
                return cached.clone();
            }
        }

        let path = self.dir.join(collection).join("_schema.yaml");
        let loaded = if path.exists() {
            match read_schema(&path) {
                Ok(schema) => Some(schema),
                Err(e) => {
                    error!(collection, path = %path.display(), error = %e, "failed to load schema");
                    None
                }
            }
        } else {
            None
        };

        self.schemas
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(collection.to_string(), loaded.clone());
        loaded
    }

    /// Collections that have a config for this vendor, sorted by name.
    /// Directories starting with `_` are skipped.
    pub fn list_collections(&self, vendor: &VendorTag) -> Vec<String> {
        let mut collections = Vec::new();
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return collections;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_dir() || name.starts_with('_') {
                continue;
            }
            if self.spec(name, vendor).is_some() {
                collections.push(name.to_string());
            }
        }
        collections.sort();
        collections
    }

    /// Effective polling interval for a collection.
    pub fn interval(&self, collection: &str, vendor: &VendorTag) -> u64 {
        self.spec(collection, vendor)
            .and_then(|s| s.interval)
            .unwrap_or_else(|| default_interval(collection))
    }
}

// ── File reading & conversion ─────────────────────────────────────────────────

fn read_collection(path: &Path) -> Result<CollectionSpec, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawCollection = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;
    convert_collection(raw, path)
}

fn convert_collection(raw: RawCollection, path: &Path) -> Result<CollectionSpec, ConfigError> {
    let parsers = raw
        .parsers
        .into_iter()
        .map(|p| convert_parser(p, path))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CollectionSpec {
        command: raw.command,
        interval: raw.interval,
        parsers,
        normalize: raw.normalize,
    })
}

fn convert_parser(raw: RawParser, path: &Path) -> Result<ParserSpec, ConfigError> {
    match raw.parser_type.to_lowercase().as_str() {
        "textfsm" => Ok(ParserSpec::TextFsm {
            templates: raw.templates,
        }),
        "ttp" => Ok(ParserSpec::Ttp {
            templates: raw.templates,
        }),
        "regex" => {
            let pattern = raw.pattern.ok_or_else(|| ConfigError::Conversion {
                path: path.display().to_string(),
                message: "regex parser has no pattern".to_string(),
            })?;
            Ok(ParserSpec::Regex {
                pattern,
                flags: raw.flags,
                groups: raw.groups,
            })
        }
        other => Err(ConfigError::Conversion {
            path: path.display().to_string(),
            message: format!("unknown parser type '{}'", other),
        }),
    }
}

fn read_schema(path: &Path) -> Result<Schema, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawSchema = serde_yaml::from_str(&content).map_err(|e| ConfigError::YamlParse {
        path: path.display().to_string(),
        source: e,
    })?;

    let mut fields = HashMap::new();
    for (name, field) in raw.fields {
        let ft = FieldType::parse(&field.field_type).ok_or_else(|| ConfigError::Conversion {
            path: path.display().to_string(),
            message: format!("unknown field type '{}' for '{}'", field.field_type, name),
        })?;
        fields.insert(name, ft);
    }
    Ok(Schema { fields })
}
