//! Definition merging
//!
//! Reconciles a partial attribute map against an existing remote definition
//! (or the engine defaults when there is none) and produces a complete
//! definition ready for submission.
//!
//! # Rules
//!
//! - Attributes not named in the overrides keep their existing value
//! - Recognized attribute names go through a typed setter
//! - Unrecognized names are stored verbatim in `extra` and forwarded; the
//!   cluster is the authority on whether they are valid
//! - Identity fields (`name`, `keyspace`) always come from the caller

use serde_json::Value;
use std::collections::BTreeMap;

use super::errors::{SchemaError, SchemaResult};
use super::qualify::qualify_strategy_class;
use super::types::{Attributes, ColumnFamilyDef, ColumnType, KeyspaceDef};

/// A definition that can absorb attribute overrides by name.
pub trait Definition: Clone + Default {
    /// Applies one override. Unrecognized names must be kept, not rejected.
    fn set_attribute(&mut self, name: &str, value: &Value) -> SchemaResult<()>;
}

/// Merges `overrides` onto a copy of `existing`, or onto the defaults.
pub fn merge<D: Definition>(existing: Option<&D>, overrides: &Attributes) -> SchemaResult<D> {
    let mut def = existing.cloned().unwrap_or_default();
    for (name, value) in overrides {
        def.set_attribute(name, value)?;
    }
    Ok(def)
}

/// Builds the keyspace definition submitted by create / alter.
pub fn merge_keyspace(
    existing: Option<&KeyspaceDef>,
    name: &str,
    overrides: &Attributes,
) -> SchemaResult<KeyspaceDef> {
    let mut def = merge(existing, overrides)?;
    def.name = name.to_string();
    Ok(def)
}

/// Builds the column family definition submitted by create / alter.
pub fn merge_column_family(
    existing: Option<&ColumnFamilyDef>,
    keyspace: &str,
    name: &str,
    overrides: &Attributes,
) -> SchemaResult<ColumnFamilyDef> {
    let mut def = merge(existing, overrides)?;
    def.keyspace = keyspace.to_string();
    def.name = name.to_string();
    Ok(def)
}

impl Definition for KeyspaceDef {
    fn set_attribute(&mut self, name: &str, value: &Value) -> SchemaResult<()> {
        match name {
            "name" => self.name = to_string(name, value)?,
            "strategy_class" => self.strategy_class = qualify_strategy_class(&to_string(name, value)?),
            "strategy_options" => self.strategy_options = to_string_map(name, value)?,
            "replication_factor" => self.replication_factor = to_opt_i32(name, value)?,
            "durable_writes" => self.durable_writes = to_opt_bool(name, value)?,
            "cf_defs" => self.cf_defs = from_json(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value.clone());
            }
        }
        Ok(())
    }
}

impl Definition for ColumnFamilyDef {
    fn set_attribute(&mut self, name: &str, value: &Value) -> SchemaResult<()> {
        match name {
            "keyspace" => self.keyspace = to_string(name, value)?,
            "name" => self.name = to_string(name, value)?,
            "column_type" => {
                let raw = to_string(name, value)?;
                self.column_type = ColumnType::parse(&raw).ok_or_else(|| {
                    SchemaError::invalid_attribute(name, format!("unknown column type '{}'", raw))
                })?;
            }
            "comparator_type" => self.comparator_type = to_string(name, value)?,
            "subcomparator_type" => self.subcomparator_type = to_opt_string(name, value)?,
            "comment" => self.comment = to_opt_string(name, value)?,
            "default_validation_class" => self.default_validation_class = to_opt_string(name, value)?,
            "key_validation_class" => self.key_validation_class = to_opt_string(name, value)?,
            "read_repair_chance" => self.read_repair_chance = to_opt_f64(name, value)?,
            "gc_grace_seconds" => self.gc_grace_seconds = to_opt_i32(name, value)?,
            "min_compaction_threshold" => self.min_compaction_threshold = to_opt_i32(name, value)?,
            "max_compaction_threshold" => self.max_compaction_threshold = to_opt_i32(name, value)?,
            "replicate_on_write" => self.replicate_on_write = to_opt_bool(name, value)?,
            "compaction_strategy" => self.compaction_strategy = to_opt_string(name, value)?,
            "compaction_strategy_options" => {
                self.compaction_strategy_options = to_string_map(name, value)?
            }
            "compression_options" => self.compression_options = to_string_map(name, value)?,
            "id" => self.id = to_opt_i32(name, value)?,
            "column_metadata" => self.column_metadata = from_json(name, value)?,
            _ => {
                self.extra.insert(name.to_string(), value.clone());
            }
        }
        Ok(())
    }
}

// =============================================================================
// Value conversion
// =============================================================================

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_string(name: &str, value: &Value) -> SchemaResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(SchemaError::invalid_attribute(
            name,
            format!("expected string, got {}", kind(other)),
        )),
    }
}

fn to_opt_string(name: &str, value: &Value) -> SchemaResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => to_string(name, other).map(Some),
    }
}

fn to_opt_i32(name: &str, value: &Value) -> SchemaResult<Option<i32>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        SchemaError::invalid_attribute(name, format!("expected 32-bit integer, got {}", value))
    })
}

fn to_opt_f64(name: &str, value: &Value) -> SchemaResult<Option<f64>> {
    let parsed = match value {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.map(Some).ok_or_else(|| {
        SchemaError::invalid_attribute(name, format!("expected number, got {}", value))
    })
}

fn to_opt_bool(name: &str, value: &Value) -> SchemaResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        other => Err(SchemaError::invalid_attribute(
            name,
            format!("expected boolean, got {}", other),
        )),
    }
}

/// Option maps travel as string → string; scalar values are stringified.
fn to_string_map(name: &str, value: &Value) -> SchemaResult<BTreeMap<String, String>> {
    let object = match value {
        Value::Null => return Ok(BTreeMap::new()),
        Value::Object(object) => object,
        other => {
            return Err(SchemaError::invalid_attribute(
                name,
                format!("expected object, got {}", kind(other)),
            ))
        }
    };

    let mut map = BTreeMap::new();
    for (key, v) in object {
        let s = match v {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(SchemaError::invalid_attribute(
                    format!("{}.{}", name, key),
                    format!("expected scalar, got {}", kind(other)),
                ))
            }
        };
        map.insert(key.clone(), s);
    }
    Ok(map)
}

fn from_json<T: serde::de::DeserializeOwned>(name: &str, value: &Value) -> SchemaResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| SchemaError::invalid_attribute(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{ColumnDef, SIMPLE_STRATEGY};
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_empty_keyspace_merge_yields_defaults() {
        let ks = merge_keyspace(None, "K1", &Attributes::new()).unwrap();
        assert_eq!(ks.name, "K1");
        assert_eq!(ks.strategy_class, SIMPLE_STRATEGY);
        assert_eq!(ks.strategy_options.get("replication_factor").unwrap(), "1");
    }

    #[test]
    fn test_legacy_replication_factor_does_not_touch_options() {
        let ks = merge_keyspace(None, "K1", &attrs(json!({"replication_factor": 2}))).unwrap();
        assert_eq!(ks.replication_factor, Some(2));
        assert_eq!(ks.strategy_options.get("replication_factor").unwrap(), "1");
        assert_eq!(ks.strategy_class, SIMPLE_STRATEGY);
    }

    #[test]
    fn test_strategy_class_is_qualified() {
        let ks = merge_keyspace(
            None,
            "K1",
            &attrs(json!({
                "strategy_class": "NetworkTopologyStrategy",
                "strategy_options": {"DC1": 3, "DC2": "2"}
            })),
        )
        .unwrap();
        assert_eq!(ks.strategy_class, "org.apache.cassandra.locator.NetworkTopologyStrategy");
        assert_eq!(ks.strategy_options.get("DC1").unwrap(), "3");
        assert_eq!(ks.strategy_options.get("DC2").unwrap(), "2");
        assert!(!ks.strategy_options.contains_key("replication_factor"));
    }

    #[test]
    fn test_merge_preserves_unnamed_attributes() {
        let mut existing = KeyspaceDef::new("K1");
        existing.durable_writes = Some(false);
        existing.cf_defs.push(ColumnFamilyDef::new("K1", "CF1"));
        existing.extra.insert("opaque".into(), json!("kept"));

        let ks = merge_keyspace(Some(&existing), "K1", &attrs(json!({"replication_factor": 3}))).unwrap();
        assert_eq!(ks.durable_writes, Some(false));
        assert_eq!(ks.cf_defs.len(), 1);
        assert_eq!(ks.extra.get("opaque"), Some(&json!("kept")));
        assert_eq!(ks.replication_factor, Some(3));
    }

    #[test]
    fn test_unknown_attributes_are_forwarded() {
        let cf = merge_column_family(
            None,
            "K1",
            "CF1",
            &attrs(json!({"bloom_filter_fp_chance": 0.01, "made_up": [1, 2]})),
        )
        .unwrap();
        assert_eq!(cf.extra.get("bloom_filter_fp_chance"), Some(&json!(0.01)));
        assert_eq!(cf.extra.get("made_up"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_identity_comes_from_caller() {
        let cf = merge_column_family(
            None,
            "K1",
            "CF1",
            &attrs(json!({"name": "Other", "keyspace": "Elsewhere"})),
        )
        .unwrap();
        assert_eq!(cf.keyspace, "K1");
        assert_eq!(cf.name, "CF1");
    }

    #[test]
    fn test_column_family_typed_setters() {
        let cf = merge_column_family(
            None,
            "K1",
            "Super1",
            &attrs(json!({
                "column_type": "Super",
                "comparator_type": "LongType",
                "subcomparator_type": "UTF8Type",
                "gc_grace_seconds": "3600",
                "read_repair_chance": 0.5,
                "replicate_on_write": "true",
                "compression_options": {"sstable_compression": "SnappyCompressor", "chunk_length_kb": 64}
            })),
        )
        .unwrap();
        assert_eq!(cf.column_type, ColumnType::Super);
        assert_eq!(cf.comparator_type, "LongType");
        assert_eq!(cf.subcomparator_type.as_deref(), Some("UTF8Type"));
        assert_eq!(cf.gc_grace_seconds, Some(3600));
        assert_eq!(cf.read_repair_chance, Some(0.5));
        assert_eq!(cf.replicate_on_write, Some(true));
        assert_eq!(cf.compression_options.get("chunk_length_kb").unwrap(), "64");
    }

    #[test]
    fn test_null_clears_optional_field() {
        let mut existing = ColumnFamilyDef::new("K1", "CF1");
        existing.comment = Some("old".into());
        let cf = merge_column_family(Some(&existing), "K1", "CF1", &attrs(json!({"comment": null}))).unwrap();
        assert_eq!(cf.comment, None);
    }

    #[test]
    fn test_existing_column_metadata_is_kept() {
        let mut existing = ColumnFamilyDef::new("K1", "CF1");
        existing.column_metadata.push(ColumnDef::named(b"name".to_vec()));
        let cf = merge_column_family(Some(&existing), "K1", "CF1", &attrs(json!({"comment": "x"}))).unwrap();
        assert_eq!(cf.column_metadata.len(), 1);
    }

    #[test]
    fn test_malformed_known_value_is_rejected() {
        let err = merge_column_family(None, "K1", "CF1", &attrs(json!({"gc_grace_seconds": "soon"})))
            .unwrap_err();
        assert_eq!(err.code(), crate::schema::SchemaErrorCode::InvalidAttribute);

        let err = merge_column_family(None, "K1", "CF1", &attrs(json!({"column_type": "Wide"})))
            .unwrap_err();
        assert!(err.to_string().contains("Wide"));

        let err = merge_keyspace(None, "K1", &attrs(json!({"strategy_options": {"dc": {"nested": 1}}})))
            .unwrap_err();
        assert!(err.to_string().contains("strategy_options.dc"));
    }
}
