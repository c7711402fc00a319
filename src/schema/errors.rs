//! Schema manager error types
//!
//! Error codes:
//! - RING_REMOTE_REJECTED (remote call refused, propagated unmodified)
//! - RING_KEYSPACE_NOT_FOUND / RING_COLUMN_FAMILY_NOT_FOUND (raised locally)
//! - RING_INVALID_ATTRIBUTE (known attribute with a value of the wrong shape)
//! - RING_INVALID_NAME / RING_INVALID_COLUMN_NAME / RING_UNSUPPORTED_TYPE
//! - RING_AGREEMENT_TIMEOUT / RING_AGREEMENT_CANCELLED
//! - RING_CONFIG_ERROR

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::cluster::TransportError;

/// Stable error codes for schema manager failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    RemoteRejected,
    KeyspaceNotFound,
    ColumnFamilyNotFound,
    InvalidAttribute,
    InvalidName,
    InvalidColumnName,
    UnsupportedType,
    AgreementTimeout,
    AgreementCancelled,
    ConfigError,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaErrorCode::RemoteRejected => "RING_REMOTE_REJECTED",
            SchemaErrorCode::KeyspaceNotFound => "RING_KEYSPACE_NOT_FOUND",
            SchemaErrorCode::ColumnFamilyNotFound => "RING_COLUMN_FAMILY_NOT_FOUND",
            SchemaErrorCode::InvalidAttribute => "RING_INVALID_ATTRIBUTE",
            SchemaErrorCode::InvalidName => "RING_INVALID_NAME",
            SchemaErrorCode::InvalidColumnName => "RING_INVALID_COLUMN_NAME",
            SchemaErrorCode::UnsupportedType => "RING_UNSUPPORTED_TYPE",
            SchemaErrorCode::AgreementTimeout => "RING_AGREEMENT_TIMEOUT",
            SchemaErrorCode::AgreementCancelled => "RING_AGREEMENT_CANCELLED",
            SchemaErrorCode::ConfigError => "RING_CONFIG_ERROR",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema manager error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    // ==================
    // Remote Errors
    // ==================
    /// The cluster refused the call. Never retried.
    #[error("remote call rejected: {0}")]
    Remote(#[from] TransportError),

    // ==================
    // Lookup Errors
    // ==================
    #[error("keyspace '{0}' not found")]
    KeyspaceNotFound(String),

    #[error("column family '{keyspace}.{column_family}' not found")]
    ColumnFamilyNotFound {
        keyspace: String,
        column_family: String,
    },

    // ==================
    // Definition Errors
    // ==================
    /// A recognized attribute carried a value of the wrong shape
    #[error("invalid value for attribute '{name}': {reason}")]
    InvalidAttribute { name: String, reason: String },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A display-form column name could not be packed with the family's comparator
    #[error("cannot encode column name '{name}' as {type_name}: {reason}")]
    InvalidColumnName {
        name: String,
        type_name: String,
        reason: String,
    },

    #[error("unsupported marshal type '{0}'")]
    UnsupportedType(String),

    // ==================
    // Agreement Errors
    // ==================
    /// The cluster still reported several schema versions when the deadline passed
    #[error("schema did not converge after {waited:?} ({} versions outstanding)", .versions.len())]
    AgreementTimeout {
        waited: Duration,
        versions: BTreeMap<String, Vec<String>>,
    },

    #[error("schema agreement wait cancelled after {polls} polls")]
    AgreementCancelled { polls: u64 },

    // ==================
    // Configuration Errors
    // ==================
    #[error("configuration error: {0}")]
    Config(String),
}

impl SchemaError {
    pub fn invalid_attribute(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_column_name(
        name: impl Into<String>,
        type_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SchemaError::InvalidColumnName {
            name: name.into(),
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn column_family_not_found(keyspace: impl Into<String>, column_family: impl Into<String>) -> Self {
        SchemaError::ColumnFamilyNotFound {
            keyspace: keyspace.into(),
            column_family: column_family.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        SchemaError::Config(message.into())
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        match self {
            SchemaError::Remote(_) => SchemaErrorCode::RemoteRejected,
            SchemaError::KeyspaceNotFound(_) => SchemaErrorCode::KeyspaceNotFound,
            SchemaError::ColumnFamilyNotFound { .. } => SchemaErrorCode::ColumnFamilyNotFound,
            SchemaError::InvalidAttribute { .. } => SchemaErrorCode::InvalidAttribute,
            SchemaError::InvalidName { .. } => SchemaErrorCode::InvalidName,
            SchemaError::InvalidColumnName { .. } => SchemaErrorCode::InvalidColumnName,
            SchemaError::UnsupportedType(_) => SchemaErrorCode::UnsupportedType,
            SchemaError::AgreementTimeout { .. } => SchemaErrorCode::AgreementTimeout,
            SchemaError::AgreementCancelled { .. } => SchemaErrorCode::AgreementCancelled,
            SchemaError::Config(_) => SchemaErrorCode::ConfigError,
        }
    }

    /// Whether the failure was detected before anything was sent to the cluster
    pub fn is_local(&self) -> bool {
        !matches!(
            self,
            SchemaError::Remote(_) | SchemaError::AgreementTimeout { .. } | SchemaError::AgreementCancelled { .. }
        )
    }

    /// Only an expired agreement wait can be resumed safely; the change itself
    /// has already been accepted by the cluster.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchemaError::AgreementTimeout { .. })
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            SchemaError::KeyspaceNotFound("ks".into()).code().as_str(),
            "RING_KEYSPACE_NOT_FOUND"
        );
        assert_eq!(
            SchemaError::column_family_not_found("ks", "cf").code(),
            SchemaErrorCode::ColumnFamilyNotFound
        );
        assert_eq!(
            SchemaError::from(TransportError::InvalidRequest("bad".into())).code(),
            SchemaErrorCode::RemoteRejected
        );
    }

    #[test]
    fn test_remote_errors_are_not_local() {
        let err = SchemaError::from(TransportError::Unavailable("node down".into()));
        assert!(!err.is_local());
        assert!(!err.is_retryable());
        assert!(SchemaError::KeyspaceNotFound("ks".into()).is_local());
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = SchemaError::AgreementTimeout {
            waited: Duration::from_secs(1),
            versions: BTreeMap::new(),
        };
        assert!(err.is_retryable());
        assert!(!SchemaError::AgreementCancelled { polls: 3 }.is_retryable());
    }

    #[test]
    fn test_display_includes_names() {
        let err = SchemaError::column_family_not_found("Keyspace1", "Standard1");
        assert_eq!(err.to_string(), "column family 'Keyspace1.Standard1' not found");

        let err = SchemaError::invalid_attribute("gc_grace_seconds", "expected integer");
        assert!(err.to_string().contains("gc_grace_seconds"));
    }
}
