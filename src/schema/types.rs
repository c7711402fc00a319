//! Schema definition types
//!
//! Definitions are value objects: built or fetched by one call, serialized into
//! the remote call, then discarded.
//!
//! - `KeyspaceDef`: a keyspace and its replication settings
//! - `ColumnFamilyDef`: a column family within a keyspace
//! - `ColumnDef`: per-column validation and indexing metadata, keyed by packed name
//!
//! Every definition carries an `extra` bag. Attribute names the manager does not
//! recognize are kept there and forwarded to the cluster untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Partial attribute overrides, keyed by attribute name
pub type Attributes = serde_json::Map<String, Value>;

/// Forwarded attributes with no typed field
pub type ExtraAttributes = BTreeMap<String, Value>;

/// Replication strategy used when a keyspace is created without one
pub const SIMPLE_STRATEGY: &str = "org.apache.cassandra.locator.SimpleStrategy";
pub const NETWORK_TOPOLOGY_STRATEGY: &str = "org.apache.cassandra.locator.NetworkTopologyStrategy";
pub const OLD_NETWORK_TOPOLOGY_STRATEGY: &str =
    "org.apache.cassandra.locator.OldNetworkTopologyStrategy";

/// Comparator used when a column family is created without one
pub const DEFAULT_COMPARATOR: &str = "BytesType";

/// Column family layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnType {
    #[default]
    Standard,
    Super,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Standard => "Standard",
            ColumnType::Super => "Super",
        }
    }

    /// Parses the engine spelling. Case-sensitive, as the cluster is.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Standard" => Some(ColumnType::Standard),
            "Super" => Some(ColumnType::Super),
            _ => None,
        }
    }
}

/// Secondary index kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndexType {
    /// Keyed index, the only kind every cluster version supports
    #[default]
    Keys,
    Custom,
    Composites,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Keys => "KEYS",
            IndexType::Custom => "CUSTOM",
            IndexType::Composites => "COMPOSITES",
        }
    }
}

/// Metadata for a single named column.
///
/// Identity is the packed `name`: the column name encoded with the family's
/// comparator (or subcomparator for super families).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDef {
    pub name: Vec<u8>,
    pub validation_class: Option<String>,
    pub index_type: Option<IndexType>,
    pub index_name: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl ColumnDef {
    /// Create an entry carrying only its packed name
    pub fn named(packed: Vec<u8>) -> Self {
        Self {
            name: packed,
            ..Default::default()
        }
    }

    pub fn is_indexed(&self) -> bool {
        self.index_type.is_some()
    }
}

/// Column family definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnFamilyDef {
    pub keyspace: String,
    pub name: String,
    pub column_type: ColumnType,
    pub comparator_type: String,
    pub subcomparator_type: Option<String>,
    pub comment: Option<String>,
    pub default_validation_class: Option<String>,
    pub key_validation_class: Option<String>,
    pub read_repair_chance: Option<f64>,
    pub gc_grace_seconds: Option<i32>,
    pub min_compaction_threshold: Option<i32>,
    pub max_compaction_threshold: Option<i32>,
    pub replicate_on_write: Option<bool>,
    pub compaction_strategy: Option<String>,
    pub compaction_strategy_options: BTreeMap<String, String>,
    pub compression_options: BTreeMap<String, String>,
    /// Cluster-assigned identifier, present on fetched definitions
    pub id: Option<i32>,
    pub column_metadata: Vec<ColumnDef>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl Default for ColumnFamilyDef {
    fn default() -> Self {
        Self {
            keyspace: String::new(),
            name: String::new(),
            column_type: ColumnType::Standard,
            comparator_type: DEFAULT_COMPARATOR.to_string(),
            subcomparator_type: None,
            comment: None,
            default_validation_class: None,
            key_validation_class: None,
            read_repair_chance: None,
            gc_grace_seconds: None,
            min_compaction_threshold: None,
            max_compaction_threshold: None,
            replicate_on_write: None,
            compaction_strategy: None,
            compaction_strategy_options: BTreeMap::new(),
            compression_options: BTreeMap::new(),
            id: None,
            column_metadata: Vec::new(),
            extra: ExtraAttributes::new(),
        }
    }
}

impl ColumnFamilyDef {
    /// Create a standard column family definition with engine defaults
    pub fn new(keyspace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the type that encodes column names in `column_metadata`.
    ///
    /// Super families key their metadata by subcolumn name.
    pub fn column_name_type(&self) -> &str {
        match self.column_type {
            ColumnType::Super => self
                .subcomparator_type
                .as_deref()
                .unwrap_or(DEFAULT_COMPARATOR),
            ColumnType::Standard => &self.comparator_type,
        }
    }

    /// Finds column metadata by packed name
    pub fn column(&self, packed: &[u8]) -> Option<&ColumnDef> {
        self.column_metadata.iter().find(|c| c.name == packed)
    }

    /// Returns the indexed columns
    pub fn indexed_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.column_metadata.iter().filter(|c| c.is_indexed())
    }
}

/// Keyspace definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyspaceDef {
    pub name: String,
    pub strategy_class: String,
    pub strategy_options: BTreeMap<String, String>,
    /// Top-level replication factor understood by older clusters
    pub replication_factor: Option<i32>,
    pub durable_writes: Option<bool>,
    pub cf_defs: Vec<ColumnFamilyDef>,
    #[serde(flatten)]
    pub extra: ExtraAttributes,
}

impl Default for KeyspaceDef {
    /// Simple strategy with a replication factor of one.
    fn default() -> Self {
        let mut strategy_options = BTreeMap::new();
        strategy_options.insert("replication_factor".to_string(), "1".to_string());
        Self {
            name: String::new(),
            strategy_class: SIMPLE_STRATEGY.to_string(),
            strategy_options,
            replication_factor: None,
            durable_writes: None,
            cf_defs: Vec::new(),
            extra: ExtraAttributes::new(),
        }
    }
}

impl KeyspaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Finds a column family by name
    pub fn column_family(&self, name: &str) -> Option<&ColumnFamilyDef> {
        self.cf_defs.iter().find(|cf| cf.name == name)
    }

    pub fn column_family_names(&self) -> Vec<&str> {
        self.cf_defs.iter().map(|cf| cf.name.as_str()).collect()
    }

    /// Copy suitable for the keyspace update call, which refuses nested
    /// column family definitions.
    pub fn without_column_families(&self) -> Self {
        Self {
            cf_defs: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyspace_defaults() {
        let ks = KeyspaceDef::new("Keyspace1");
        assert_eq!(ks.name, "Keyspace1");
        assert_eq!(ks.strategy_class, SIMPLE_STRATEGY);
        assert_eq!(ks.strategy_options.get("replication_factor").map(String::as_str), Some("1"));
        assert!(ks.cf_defs.is_empty());
    }

    #[test]
    fn test_column_family_defaults() {
        let cf = ColumnFamilyDef::new("Keyspace1", "Users");
        assert_eq!(cf.column_type, ColumnType::Standard);
        assert_eq!(cf.comparator_type, DEFAULT_COMPARATOR);
        assert!(cf.column_metadata.is_empty());
    }

    #[test]
    fn test_column_name_type_uses_subcomparator_for_super() {
        let mut cf = ColumnFamilyDef::new("ks", "cf");
        cf.comparator_type = "LongType".into();
        cf.subcomparator_type = Some("UTF8Type".into());
        assert_eq!(cf.column_name_type(), "LongType");

        cf.column_type = ColumnType::Super;
        assert_eq!(cf.column_name_type(), "UTF8Type");
    }

    #[test]
    fn test_column_type_parse_is_case_sensitive() {
        assert_eq!(ColumnType::parse("Super"), Some(ColumnType::Super));
        assert_eq!(ColumnType::parse("super"), None);
    }

    #[test]
    fn test_extra_attributes_are_flattened() {
        let mut ks = KeyspaceDef::new("ks");
        ks.extra.insert("future_option".into(), json!(true));

        let value = serde_json::to_value(&ks).unwrap();
        assert_eq!(value["future_option"], json!(true));

        let back: KeyspaceDef = serde_json::from_value(value).unwrap();
        assert_eq!(back.extra.get("future_option"), Some(&json!(true)));
    }

    #[test]
    fn test_index_type_wire_names() {
        assert_eq!(serde_json::to_value(IndexType::Keys).unwrap(), json!("KEYS"));
        assert_eq!(IndexType::Composites.as_str(), "COMPOSITES");
    }

    #[test]
    fn test_without_column_families() {
        let mut ks = KeyspaceDef::new("ks");
        ks.cf_defs.push(ColumnFamilyDef::new("ks", "cf"));
        let stripped = ks.without_column_families();
        assert!(stripped.cf_defs.is_empty());
        assert_eq!(stripped.name, "ks");
        assert_eq!(ks.cf_defs.len(), 1);
    }
}
