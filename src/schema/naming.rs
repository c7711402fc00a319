//! Keyspace and column family name rules
//!
//! Names must be word characters only and at most 48 long; the cluster
//! builds file names from them.

use regex::Regex;
use std::sync::OnceLock;

use super::errors::{SchemaError, SchemaResult};

/// Longest keyspace or column family name the cluster accepts
pub const MAX_NAME_LENGTH: usize = 48;

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\w+$").expect("name pattern is valid"))
}

/// Checks a keyspace or column family name before it is sent anywhere
pub fn validate_name(name: &str) -> SchemaResult<()> {
    if name.is_empty() {
        return Err(SchemaError::invalid_name(name, "name is empty"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(SchemaError::invalid_name(
            name,
            format!("longer than {} characters", MAX_NAME_LENGTH),
        ));
    }
    if !name_pattern().is_match(name) {
        return Err(SchemaError::invalid_name(
            name,
            "only letters, digits and underscores are allowed",
        ));
    }
    Ok(())
}
