//! ringschema - Schema definition manager for column-family clusters
//!
//! Builds, merges and submits keyspace, column family and column metadata
//! changes, then blocks until the cluster agrees on the resulting schema.

pub mod cluster;
pub mod config;
pub mod logging;
pub mod manager;
pub mod marshal;
pub mod schema;

pub use manager::SchemaManager;
