//! In-memory cluster transport
//!
//! Behaves like a small cluster for the schema calls: it enforces keyspace and
//! column family existence, assigns schema versions, and can be scripted to
//! report disagreement or fail the next call. Every mutating call is recorded
//! in submission order so callers can inspect exactly what was sent.

use std::collections::BTreeMap;
use uuid::Uuid;

use super::agreement::UNREACHABLE;
use super::transport::{EndpointDetails, SchemaTransport, TokenRange, TransportError, TransportResult};
use crate::schema::{ColumnFamilyDef, KeyspaceDef};

/// A mutating call received by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    AddKeyspace(KeyspaceDef),
    UpdateKeyspace(KeyspaceDef),
    DropKeyspace(String),
    AddColumnFamily(ColumnFamilyDef),
    UpdateColumnFamily(ColumnFamilyDef),
    DropColumnFamily { keyspace: String, name: String },
    Truncate { keyspace: String, name: String },
}

/// In-process stand-in for a cluster connection
#[derive(Debug)]
pub struct MemoryTransport {
    cluster_name: String,
    api_version: String,
    partitioner: String,
    snitch: String,
    nodes: Vec<String>,
    unreachable: Vec<String>,
    keyspaces: BTreeMap<String, KeyspaceDef>,
    current_keyspace: Option<String>,
    schema_version: Uuid,
    previous_version: Uuid,
    pending_disagreement: u64,
    polls: u64,
    next_cf_id: i32,
    fail_next: Option<TransportError>,
    submissions: Vec<Submission>,
    closed: bool,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Single-node cluster with no keyspaces
    pub fn new() -> Self {
        let version = Uuid::new_v4();
        Self {
            cluster_name: "Test Cluster".to_string(),
            api_version: "19.36.0".to_string(),
            partitioner: "org.apache.cassandra.dht.RandomPartitioner".to_string(),
            snitch: "org.apache.cassandra.locator.SimpleSnitch".to_string(),
            nodes: vec!["127.0.0.1".to_string()],
            unreachable: Vec::new(),
            keyspaces: BTreeMap::new(),
            current_keyspace: None,
            schema_version: version,
            previous_version: version,
            pending_disagreement: 0,
            polls: 0,
            next_cf_id: 1000,
            fail_next: None,
            submissions: Vec::new(),
            closed: false,
        }
    }

    pub fn with_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = name.into();
        self
    }

    /// Registers a keyspace without recording a submission
    pub fn with_keyspace(mut self, def: KeyspaceDef) -> Self {
        self.store_keyspace(def);
        self
    }

    /// Report two schema versions for the next `polls` polls
    pub fn script_disagreement(&mut self, polls: u64) {
        self.pending_disagreement = polls;
    }

    /// Fail the next call with `error`
    pub fn fail_next(&mut self, error: TransportError) {
        self.fail_next = Some(error);
    }

    /// Mark nodes as down. They are reported under the unreachable version
    /// and block truncation.
    pub fn set_unreachable<I, S>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unreachable = nodes.into_iter().map(Into::into).collect();
    }

    pub fn submissions(&self) -> &[Submission] {
        &self.submissions
    }

    pub fn last_submission(&self) -> Option<&Submission> {
        self.submissions.last()
    }

    pub fn poll_count(&self) -> u64 {
        self.polls
    }

    pub fn keyspace(&self, name: &str) -> Option<&KeyspaceDef> {
        self.keyspaces.get(name)
    }

    pub fn current_keyspace(&self) -> Option<&str> {
        self.current_keyspace.as_deref()
    }

    pub fn schema_version(&self) -> String {
        self.schema_version.to_string()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn bump_version(&mut self) -> String {
        self.previous_version = self.schema_version;
        self.schema_version = Uuid::new_v4();
        self.schema_version.to_string()
    }

    fn store_keyspace(&mut self, mut def: KeyspaceDef) {
        let name = def.name.clone();
        for cf in def.cf_defs.iter_mut() {
            cf.keyspace = name.clone();
            if cf.id.is_none() {
                cf.id = Some(self.next_cf_id);
                self.next_cf_id += 1;
            }
        }
        self.keyspaces.insert(name, def);
    }

    fn keyspace_in_context(&self) -> TransportResult<String> {
        self.current_keyspace
            .clone()
            .ok_or_else(|| TransportError::InvalidRequest("You have not set a keyspace for this session".into()))
    }

    fn keyspace_mut(&mut self, name: &str) -> TransportResult<&mut KeyspaceDef> {
        self.keyspaces
            .get_mut(name)
            .ok_or_else(|| TransportError::InvalidRequest(format!("Keyspace {} does not exist", name)))
    }

    fn replication_factor(def: &KeyspaceDef) -> usize {
        def.strategy_options
            .get("replication_factor")
            .and_then(|rf| rf.parse::<usize>().ok())
            .or_else(|| def.replication_factor.and_then(|rf| usize::try_from(rf).ok()))
            .unwrap_or(1)
    }
}

impl SchemaTransport for MemoryTransport {
    fn set_keyspace(&mut self, keyspace: &str) -> TransportResult<()> {
        self.check()?;
        if !self.keyspaces.contains_key(keyspace) {
            return Err(TransportError::InvalidRequest(format!(
                "Keyspace {} does not exist",
                keyspace
            )));
        }
        self.current_keyspace = Some(keyspace.to_string());
        Ok(())
    }

    fn add_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String> {
        self.check()?;
        if self.keyspaces.contains_key(&def.name) {
            return Err(TransportError::InvalidRequest(format!(
                "Keyspace names must be case-insensitively unique (\"{}\" conflicts)",
                def.name
            )));
        }
        self.submissions.push(Submission::AddKeyspace(def.clone()));
        self.store_keyspace(def.clone());
        Ok(self.bump_version())
    }

    fn update_keyspace(&mut self, def: &KeyspaceDef) -> TransportResult<String> {
        self.check()?;
        if !def.cf_defs.is_empty() {
            return Err(TransportError::InvalidRequest(
                "Keyspace update must not contain any column family definitions.".into(),
            ));
        }
        let stored = self.keyspace_mut(&def.name)?;
        let cf_defs = std::mem::take(&mut stored.cf_defs);
        *stored = KeyspaceDef {
            cf_defs,
            ..def.clone()
        };
        self.submissions.push(Submission::UpdateKeyspace(def.clone()));
        Ok(self.bump_version())
    }

    fn drop_keyspace(&mut self, name: &str) -> TransportResult<String> {
        self.check()?;
        if self.keyspaces.remove(name).is_none() {
            return Err(TransportError::InvalidRequest(format!(
                "Keyspace {} does not exist",
                name
            )));
        }
        if self.current_keyspace.as_deref() == Some(name) {
            self.current_keyspace = None;
        }
        self.submissions.push(Submission::DropKeyspace(name.to_string()));
        Ok(self.bump_version())
    }

    fn add_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String> {
        self.check()?;
        let keyspace = self.keyspace_in_context()?;
        if def.keyspace != keyspace {
            return Err(TransportError::InvalidRequest(format!(
                "CfDef ({}) had a keyspace definition that did not match the current keyspace ({})",
                def.keyspace, keyspace
            )));
        }
        let id = self.next_cf_id;
        let ks = self.keyspace_mut(&keyspace)?;
        if ks.column_family(&def.name).is_some() {
            return Err(TransportError::InvalidRequest(format!(
                "{} already exists in keyspace {}",
                def.name, keyspace
            )));
        }
        let mut stored = def.clone();
        stored.id = Some(id);
        ks.cf_defs.push(stored);
        self.next_cf_id += 1;
        self.submissions.push(Submission::AddColumnFamily(def.clone()));
        Ok(self.bump_version())
    }

    fn update_column_family(&mut self, def: &ColumnFamilyDef) -> TransportResult<String> {
        self.check()?;
        let ks = self.keyspace_mut(&def.keyspace)?;
        let slot = ks
            .cf_defs
            .iter_mut()
            .find(|cf| cf.name == def.name)
            .ok_or_else(|| TransportError::InvalidRequest(format!("Could not find column family {}", def.name)))?;
        if def.id.is_some() && def.id != slot.id {
            return Err(TransportError::InvalidRequest("Column family id mismatch".into()));
        }
        let id = slot.id;
        *slot = ColumnFamilyDef { id, ..def.clone() };
        self.submissions.push(Submission::UpdateColumnFamily(def.clone()));
        Ok(self.bump_version())
    }

    fn drop_column_family(&mut self, name: &str) -> TransportResult<String> {
        self.check()?;
        let keyspace = self.keyspace_in_context()?;
        let ks = self.keyspace_mut(&keyspace)?;
        let before = ks.cf_defs.len();
        ks.cf_defs.retain(|cf| cf.name != name);
        if ks.cf_defs.len() == before {
            return Err(TransportError::InvalidRequest(format!(
                "CF is not defined in that keyspace: {}",
                name
            )));
        }
        self.submissions.push(Submission::DropColumnFamily {
            keyspace,
            name: name.to_string(),
        });
        Ok(self.bump_version())
    }

    fn truncate(&mut self, column_family: &str) -> TransportResult<()> {
        self.check()?;
        let keyspace = self.keyspace_in_context()?;
        if !self.unreachable.is_empty() {
            return Err(TransportError::Unavailable(format!(
                "cannot truncate with {} nodes down",
                self.unreachable.len()
            )));
        }
        let exists = self
            .keyspaces
            .get(&keyspace)
            .and_then(|ks| ks.column_family(column_family))
            .is_some();
        if !exists {
            return Err(TransportError::InvalidRequest(format!(
                "unconfigured columnfamily {}",
                column_family
            )));
        }
        self.submissions.push(Submission::Truncate {
            keyspace,
            name: column_family.to_string(),
        });
        Ok(())
    }

    fn describe_keyspace(&mut self, name: &str) -> TransportResult<KeyspaceDef> {
        self.check()?;
        self.keyspaces
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::NotFound(format!("keyspace {}", name)))
    }

    fn describe_keyspaces(&mut self) -> TransportResult<Vec<KeyspaceDef>> {
        self.check()?;
        Ok(self.keyspaces.values().cloned().collect())
    }

    fn describe_schema_versions(&mut self) -> TransportResult<BTreeMap<String, Vec<String>>> {
        self.check()?;
        self.polls += 1;

        let reachable: Vec<String> = self
            .nodes
            .iter()
            .filter(|n| !self.unreachable.contains(*n))
            .cloned()
            .collect();

        let mut versions = BTreeMap::new();
        if self.pending_disagreement > 0 {
            self.pending_disagreement -= 1;
            let stale = if self.previous_version == self.schema_version {
                Uuid::new_v4()
            } else {
                self.previous_version
            };
            let (lagging, current) = match reachable.split_first() {
                Some((first, rest)) if !rest.is_empty() => (vec![first.clone()], rest.to_vec()),
                _ => (reachable.clone(), reachable.clone()),
            };
            versions.insert(stale.to_string(), lagging);
            versions.insert(self.schema_version.to_string(), current);
        } else {
            versions.insert(self.schema_version.to_string(), reachable);
        }
        if !self.unreachable.is_empty() {
            versions.insert(UNREACHABLE.to_string(), self.unreachable.clone());
        }
        Ok(versions)
    }

    fn describe_ring(&mut self, keyspace: &str) -> TransportResult<Vec<TokenRange>> {
        self.check()?;
        let def = self
            .keyspaces
            .get(keyspace)
            .ok_or_else(|| TransportError::InvalidRequest(format!("No such keyspace: {}", keyspace)))?;

        let count = self.nodes.len().max(1);
        let rf = Self::replication_factor(def).clamp(1, count);
        let step = u128::MAX / count as u128;
        let token = |i: usize| (step * i as u128).to_string();

        let ranges = (0..self.nodes.len())
            .map(|i| {
                let endpoints: Vec<String> = (0..rf)
                    .map(|r| self.nodes[(i + r) % self.nodes.len()].clone())
                    .collect();
                TokenRange {
                    start_token: token(i),
                    end_token: token((i + 1) % count),
                    rpc_endpoints: endpoints.clone(),
                    endpoint_details: endpoints
                        .iter()
                        .map(|host| EndpointDetails {
                            host: host.clone(),
                            datacenter: "datacenter1".to_string(),
                            rack: Some("rack1".to_string()),
                        })
                        .collect(),
                    endpoints,
                }
            })
            .collect();
        Ok(ranges)
    }

    fn describe_cluster_name(&mut self) -> TransportResult<String> {
        self.check()?;
        Ok(self.cluster_name.clone())
    }

    fn describe_version(&mut self) -> TransportResult<String> {
        self.check()?;
        Ok(self.api_version.clone())
    }

    fn describe_partitioner(&mut self) -> TransportResult<String> {
        self.check()?;
        Ok(self.partitioner.clone())
    }

    fn describe_snitch(&mut self) -> TransportResult<String> {
        self.check()?;
        Ok(self.snitch.clone())
    }

    fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.closed = true;
        Ok(())
    }
}
