//! Remote schema transport
//!
//! The boundary between the schema manager and the connection that carries
//! its calls. Calls are synchronous, one at a time and ordered; there is no
//! pipelining. Socket lifecycle, framing and authentication live behind the
//! implementation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::schema::{ColumnFamilyDef, KeyspaceDef};

/// Failure reported by the remote side or the connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The definition or request was refused (bad definition, name conflict)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Not enough nodes reachable to perform the call
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    /// The cluster refused a schema change while its nodes disagree
    #[error("schema disagreement: {0}")]
    SchemaDisagreement(String),

    #[error("connection closed")]
    Closed,

    #[error("connection error: {0}")]
    Connection(String),
}

/// Result type for transport calls
pub type TransportResult<T> = Result<T, TransportError>;

/// Location of one replica endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointDetails {
    pub host: String,
    pub datacenter: String,
    pub rack: Option<String>,
}

/// One token range of the ring and the endpoints replicating it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRange {
    pub start_token: String,
    pub end_token: String,
    pub endpoints: Vec<String>,
    pub rpc_endpoints: Vec<String>,
    pub endpoint_details: Vec<EndpointDetails>,
}

/// Schema calls a cluster connection must provide.
///
/// Mutating calls return the schema version identifier the coordinator
/// produced for the change.
pub trait SchemaTransport {
    /// Sets the keyspace context for subsequent column family calls
    fn set_keyspace(&mut self, keyspace: &str) -> TransportResult<()>;

    fn add_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String>;
    fn update_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String>;
    fn drop_keyspace(&mut self, name: &str) -> TransportResult<String>;

    fn add_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String>;
    fn update_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String>;
    /// Drops a column family of the current keyspace
    fn drop_column_family(&mut self, name: &str) -> TransportResult<String>;

    /// Removes all data of a column family in the current keyspace.
    /// Requires every node to be reachable.
    fn truncate(&mut self, column_family: &str) -> TransportResult<()>;

    fn describe_keyspace(&mut self, name: &str) -> TransportResult<KeyspaceDef>;
    fn describe_keyspaces(&mut self) -> TransportResult<Vec<KeyspaceDef>>;

    /// Schema version identifier → addresses of the nodes reporting it
    fn describe_schema_versions(&mut self) -> TransportResult<BTreeMap<String, Vec<String>>>;

    fn describe_ring(&mut self, keyspace: &str) -> TransportResult<Vec<TokenRange>>;
    fn describe_cluster_name(&mut self) -> TransportResult<String>;
    fn describe_version(&mut self) -> TransportResult<String>;
    fn describe_partitioner(&mut self) -> TransportResult<String>;
    fn describe_snitch(&mut self) -> TransportResult<String>;

    /// Releases the connection. Further calls fail with `TransportError::Closed`.
    fn close(&mut self) -> TransportResult<()>;
}

/// Lets a manager borrow a connection the caller keeps ownership of
impl<T: SchemaTransport + ?Sized> SchemaTransport for &mut T {
    fn set_keyspace(&mut self, keyspace: &str) -> TransportResult<()> {
        (**self).set_keyspace(keyspace)
    }
    fn add_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String> {
        (**self).add_keyspace(def)
    }
    fn update_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String> {
        (**self).update_keyspace(def)
    }
    fn drop_keyspace(&mut self, name: &str) -> TransportResult<String> {
        (**self).drop_keyspace(name)
    }
    fn add_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String> {
        (**self).add_column_family(def)
    }
    fn update_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String> {
        (**self).update_column_family(def)
    }
    fn drop_column_family(&mut self, name: &str) -> TransportResult<String> {
        (**self).drop_column_family(name)
    }
    fn truncate(&mut self, column_family: &str) -> TransportResult<()> {
        (**self).truncate(column_family)
    }
    fn describe_keyspace(&mut self, name: &str) -> TransportResult<KeyspaceDef> {
        (**self).describe_keyspace(name)
    }
    fn describe_keyspaces(&mut self) -> TransportResult<Vec<KeyspaceDef>> {
        (**self).describe_keyspaces()
    }
    fn describe_schema_versions(&mut self) -> TransportResult<BTreeMap<String, Vec<String>>> {
        (**self).describe_schema_versions()
    }
    fn describe_ring(&mut self, keyspace: &str) -> TransportResult<Vec<TokenRange>> {
        (**self).describe_ring(keyspace)
    }
    fn describe_cluster_name(&mut self) -> TransportResult<String> {
        (**self).describe_cluster_name()
    }
    fn describe_version(&mut self) -> TransportResult<String> {
        (**self).describe_version()
    }
    fn describe_partitioner(&mut self) -> TransportResult<String> {
        (**self).describe_partitioner()
    }
    fn describe_snitch(&mut self) -> TransportResult<String> {
        (**self).describe_snitch()
    }
    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }
}
