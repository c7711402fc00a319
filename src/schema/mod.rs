//! Schema definitions subsystem
//!
//! Builds the keyspace, column family and column definitions submitted to the
//! cluster.
//!
//! # Design Principles
//!
//! - Definitions are value objects owned by the call that builds them
//! - Partial attribute maps merge onto full definitions; unnamed attributes survive
//! - Unknown attribute names are forwarded, never dropped
//! - Column metadata is identified by packed name, never by display string
//! - Name and shape errors are raised locally, before any remote call

mod column;
mod errors;
mod merge;
mod naming;
mod qualify;
mod types;

pub use column::{edit_column, ColumnEdit, FieldEdit};
pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use merge::{merge, merge_column_family, merge_keyspace, Definition};
pub use naming::{validate_name, MAX_NAME_LENGTH};
pub use qualify::{qualify_strategy_class, qualify_type_name, LOCATOR_NAMESPACE, MARSHAL_NAMESPACE};
pub use types::{
    Attributes, ColumnDef, ColumnFamilyDef, ColumnType, ExtraAttributes, IndexType, KeyspaceDef,
    DEFAULT_COMPARATOR, NETWORK_TOPOLOGY_STRATEGY, OLD_NETWORK_TOPOLOGY_STRATEGY, SIMPLE_STRATEGY,
};
