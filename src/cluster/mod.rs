//! Cluster subsystem
//!
//! - The transport boundary the schema manager talks through
//! - Schema agreement observation after every schema change
//! - An in-memory transport for tests and embedding
//!
//! The manager never runs consensus of its own. It only observes the schema
//! versions the cluster reports.

mod agreement;
mod memory;
mod transport;

pub use agreement::{
    await_agreement, AgreementPolicy, AgreementReport, CancellationFlag, SchemaVersionView,
    DEFAULT_POLL_INTERVAL, UNREACHABLE,
};
pub use memory::{MemoryTransport, Submission};
pub use transport::{EndpointDetails, SchemaTransport, TokenRange, TransportError, TransportResult};
