//! Schema manager subsystem
//!
//! The orchestrator behind every keyspace, column family and column metadata
//! change:
//! - Fetches the current definition when a change is partial
//! - Merges or edits locally, raising name and lookup errors before any remote mutation
//! - Submits through the transport and waits for schema agreement
//!
//! Truncation and the describe calls do not wait for agreement.

mod schema_manager;

pub use schema_manager::SchemaManager;
