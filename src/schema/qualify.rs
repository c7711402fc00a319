//! Class name qualification
//!
//! Short names are expanded into the storage engine's namespaces. Any name that
//! already contains a `.` is treated as qualified and returned unchanged.

/// Namespace of marshal (comparator / validator) types
pub const MARSHAL_NAMESPACE: &str = "org.apache.cassandra.db.marshal";

/// Namespace of replication strategies
pub const LOCATOR_NAMESPACE: &str = "org.apache.cassandra.locator";

fn qualify_in(namespace: &str, name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Qualifies a marshal type name.
///
/// `None` means no value was requested and passes through as `None`.
pub fn qualify_type_name(name: Option<&str>) -> Option<String> {
    name.map(|n| qualify_in(MARSHAL_NAMESPACE, n))
}

/// Qualifies a replication strategy class name
pub fn qualify_strategy_class(name: &str) -> String {
    qualify_in(LOCATOR_NAMESPACE, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_type_name_is_prefixed() {
        assert_eq!(
            qualify_type_name(Some("UTF8Type")).as_deref(),
            Some("org.apache.cassandra.db.marshal.UTF8Type")
        );
    }

    #[test]
    fn test_qualified_type_name_is_unchanged() {
        assert_eq!(
            qualify_type_name(Some("com.example.MyType")).as_deref(),
            Some("com.example.MyType")
        );
    }

    #[test]
    fn test_absent_type_name_stays_absent() {
        assert_eq!(qualify_type_name(None), None);
    }

    #[test]
    fn test_strategy_class() {
        assert_eq!(
            qualify_strategy_class("NetworkTopologyStrategy"),
            "org.apache.cassandra.locator.NetworkTopologyStrategy"
        );
        assert_eq!(
            qualify_strategy_class("org.apache.cassandra.locator.SimpleStrategy"),
            "org.apache.cassandra.locator.SimpleStrategy"
        );
    }
}
