//! Schema Manager
//!
//! Owns one cluster connection and runs every schema change through the same
//! flow: read what is needed, merge or edit locally, submit, then wait for the
//! cluster to agree on the new schema version.
//!
//! Non-Responsibilities:
//! - Does not retry failed remote calls
//! - Does not mask non-idempotent submissions (a repeated create conflicts)
//! - Does not validate attribute names; the cluster does

use tracing::{info, warn};

use crate::cluster::{
    await_agreement, AgreementPolicy, AgreementReport, CancellationFlag, SchemaTransport,
    SchemaVersionView, TokenRange, TransportError,
};
use crate::config::ManagerConfig;
use crate::schema::{
    edit_column, merge_column_family, merge_keyspace, validate_name, Attributes, ColumnEdit,
    ColumnFamilyDef, IndexType, KeyspaceDef, SchemaError, SchemaResult,
};

/// Schema definition manager bound to a single transport.
///
/// Not meant to be shared between callers: every operation takes `&mut self`
/// and blocks until the remote call, and for schema changes the agreement
/// wait, has finished.
pub struct SchemaManager<T: SchemaTransport> {
    transport: T,
    policy: AgreementPolicy,
    cancel: CancellationFlag,
    closed: bool,
}

impl<T: SchemaTransport> SchemaManager<T> {
    /// Manager waiting for agreement without a deadline
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: AgreementPolicy::default(),
            cancel: CancellationFlag::new(),
            closed: false,
        }
    }

    pub fn with_config(transport: T, config: &ManagerConfig) -> Self {
        let mut manager = Self::new(transport);
        manager.policy = config.agreement_policy();
        manager
    }

    pub fn agreement_policy(&self) -> &AgreementPolicy {
        &self.policy
    }

    pub fn set_agreement_policy(&mut self, policy: AgreementPolicy) {
        self.policy = policy;
    }

    /// Handle that cancels the agreement wait in progress from another thread.
    ///
    /// Only a wait that is running can be cancelled: every wait re-arms the
    /// flag when it starts, so a `cancel()` issued between operations is
    /// discarded.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // =========================================================================
    // KEYSPACES
    // =========================================================================

    /// Create a keyspace from the engine defaults plus `attrs`.
    pub fn create_keyspace(&mut self, name: &str, attrs: &Attributes) -> SchemaResult<AgreementReport> {
        validate_name(name)?;
        let def = merge_keyspace(None, name, attrs)?;

        info!(keyspace = name, strategy = %def.strategy_class, "creating keyspace");
        self.transport.add_keyspace(&def)?;
        self.wait_for_agreement()
    }

    /// Merge `attrs` onto the current keyspace definition and submit it.
    ///
    /// Column families are never re-sent; the update call only carries the
    /// keyspace's own attributes.
    pub fn alter_keyspace(&mut self, name: &str, attrs: &Attributes) -> SchemaResult<AgreementReport> {
        validate_name(name)?;
        let existing = self.keyspace_def(name)?;
        let def = merge_keyspace(Some(&existing), name, attrs)?;

        info!(keyspace = name, attributes = attrs.len(), "altering keyspace");
        self.transport.update_keyspace(&def.without_column_families())?;
        self.wait_for_agreement()
    }

    pub fn drop_keyspace(&mut self, name: &str) -> SchemaResult<AgreementReport> {
        validate_name(name)?;

        info!(keyspace = name, "dropping keyspace");
        self.transport.drop_keyspace(name)?;
        self.wait_for_agreement()
    }

    // =========================================================================
    // COLUMN FAMILIES
    // =========================================================================

    pub fn create_column_family(
        &mut self,
        keyspace: &str,
        column_family: &str,
        attrs: &Attributes,
    ) -> SchemaResult<AgreementReport> {
        validate_name(keyspace)?;
        validate_name(column_family)?;
        self.transport.set_keyspace(keyspace)?;
        let def = merge_column_family(None, keyspace, column_family, attrs)?;

        info!(keyspace, column_family, column_type = def.column_type.as_str(), "creating column family");
        self.transport.add_column_family(&def)?;
        self.wait_for_agreement()
    }

    /// Merge `attrs` onto the current definition of the family and submit it.
    pub fn alter_column_family(
        &mut self,
        keyspace: &str,
        column_family: &str,
        attrs: &Attributes,
    ) -> SchemaResult<AgreementReport> {
        validate_name(keyspace)?;
        validate_name(column_family)?;
        let existing = self.column_family_def(keyspace, column_family)?;
        let def = merge_column_family(Some(&existing), keyspace, column_family, attrs)?;

        self.transport.set_keyspace(keyspace)?;
        info!(keyspace, column_family, attributes = attrs.len(), "altering column family");
        self.transport.update_column_family(&def)?;
        self.wait_for_agreement()
    }

    pub fn drop_column_family(&mut self, keyspace: &str, column_family: &str) -> SchemaResult<AgreementReport> {
        validate_name(keyspace)?;
        validate_name(column_family)?;
        self.transport.set_keyspace(keyspace)?;

        info!(keyspace, column_family, "dropping column family");
        self.transport.drop_column_family(column_family)?;
        self.wait_for_agreement()
    }

    /// Remove every row of the family.
    ///
    /// A data operation: there is no agreement wait, and the call fails when
    /// any node is unreachable.
    pub fn truncate_column_family(&mut self, keyspace: &str, column_family: &str) -> SchemaResult<()> {
        validate_name(keyspace)?;
        validate_name(column_family)?;
        self.transport.set_keyspace(keyspace)?;

        info!(keyspace, column_family, "truncating column family");
        self.transport.truncate(column_family)?;
        Ok(())
    }

    // =========================================================================
    // COLUMN METADATA
    // =========================================================================

    /// Index `column`, optionally setting its validation class.
    ///
    /// `index_name` is always written: `None` leaves the index unnamed and
    /// the cluster picks a name.
    pub fn create_index(
        &mut self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        data_type: Option<&str>,
        index_name: Option<&str>,
        index_type: IndexType,
    ) -> SchemaResult<AgreementReport> {
        let edit = ColumnEdit::create_index(data_type, index_type, index_name);
        self.edit_column_metadata(keyspace, column_family, column, edit)
    }

    /// Remove the index on `column`. Its validation class is kept.
    pub fn drop_index(&mut self, keyspace: &str, column_family: &str, column: &str) -> SchemaResult<AgreementReport> {
        self.edit_column_metadata(keyspace, column_family, column, ColumnEdit::drop_index())
    }

    /// Change the validation class of `column`. Index settings are kept.
    pub fn alter_column(
        &mut self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        data_type: &str,
    ) -> SchemaResult<AgreementReport> {
        self.edit_column_metadata(keyspace, column_family, column, ColumnEdit::alter_type(data_type))
    }

    fn edit_column_metadata(
        &mut self,
        keyspace: &str,
        column_family: &str,
        column: &str,
        edit: ColumnEdit,
    ) -> SchemaResult<AgreementReport> {
        validate_name(keyspace)?;
        validate_name(column_family)?;
        let existing = self.column_family_def(keyspace, column_family)?;
        let def = edit_column(existing, column, edit)?;

        self.transport.set_keyspace(keyspace)?;
        info!(keyspace, column_family, column, "updating column metadata");
        self.transport.update_column_family(&def)?;
        self.wait_for_agreement()
    }

    // =========================================================================
    // DESCRIBE
    // =========================================================================

    /// Current definition of a family, looked up in its keyspace's family list
    pub fn column_family_def(&mut self, keyspace: &str, column_family: &str) -> SchemaResult<ColumnFamilyDef> {
        let ks = self.keyspace_def(keyspace)?;
        ks.cf_defs
            .into_iter()
            .find(|cf| cf.name == column_family)
            .ok_or_else(|| SchemaError::column_family_not_found(keyspace, column_family))
    }

    pub fn describe_keyspace(&mut self, name: &str) -> SchemaResult<KeyspaceDef> {
        self.keyspace_def(name)
    }

    pub fn describe_keyspaces(&mut self) -> SchemaResult<Vec<KeyspaceDef>> {
        Ok(self.transport.describe_keyspaces()?)
    }

    pub fn describe_schema_versions(&mut self) -> SchemaResult<SchemaVersionView> {
        Ok(self.transport.describe_schema_versions()?.into())
    }

    pub fn describe_ring(&mut self, keyspace: &str) -> SchemaResult<Vec<TokenRange>> {
        Ok(self.transport.describe_ring(keyspace)?)
    }

    pub fn describe_cluster_name(&mut self) -> SchemaResult<String> {
        Ok(self.transport.describe_cluster_name()?)
    }

    pub fn describe_version(&mut self) -> SchemaResult<String> {
        Ok(self.transport.describe_version()?)
    }

    pub fn describe_partitioner(&mut self) -> SchemaResult<String> {
        Ok(self.transport.describe_partitioner()?)
    }

    pub fn describe_snitch(&mut self) -> SchemaResult<String> {
        Ok(self.transport.describe_snitch()?)
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Release the connection, reporting a failure to close it.
    pub fn close(mut self) -> SchemaResult<()> {
        self.closed = true;
        self.transport.close()?;
        Ok(())
    }

    fn keyspace_def(&mut self, name: &str) -> SchemaResult<KeyspaceDef> {
        match self.transport.describe_keyspace(name) {
            Ok(def) => Ok(def),
            Err(TransportError::NotFound(_)) => Err(SchemaError::KeyspaceNotFound(name.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn wait_for_agreement(&mut self) -> SchemaResult<AgreementReport> {
        self.cancel.reset();
        await_agreement(&mut self.transport, &self.policy, &self.cancel)
    }
}

impl<T: SchemaTransport> Drop for SchemaManager<T> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.transport.close() {
            warn!(error = %e, "failed to close schema transport");
        }
    }
}
