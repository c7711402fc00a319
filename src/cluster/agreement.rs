//! Schema agreement
//!
//! Schema changes propagate asynchronously. After a change the manager polls
//! the cluster until every node reports the same schema version.
//!
//! Unbounded waiting is a policy choice, not a hard-coded loop: the wait can
//! be given a deadline and can be cancelled from another thread.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::transport::SchemaTransport;
use crate::schema::{SchemaError, SchemaResult};

/// Version key under which the cluster lists nodes it cannot reach
pub const UNREACHABLE: &str = "UNREACHABLE";

/// Default pause between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Snapshot of schema version → reporting nodes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaVersionView {
    versions: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaVersionView {
    pub fn new(versions: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            versions: versions
                .into_iter()
                .map(|(version, nodes)| (version, nodes.into_iter().collect()))
                .collect(),
        }
    }

    /// Number of distinct versions, counting the unreachable bucket
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Agreement means exactly one version key
    pub fn is_agreed(&self) -> bool {
        self.versions.len() == 1
    }

    pub fn agreed_version(&self) -> Option<&str> {
        if self.is_agreed() {
            self.versions.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn nodes_for(&self, version: &str) -> Option<&BTreeSet<String>> {
        self.versions.get(version)
    }

    pub fn unreachable_nodes(&self) -> Vec<&str> {
        self.versions
            .get(UNREACHABLE)
            .map(|nodes| nodes.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.versions
            .into_iter()
            .map(|(version, nodes)| (version, nodes.into_iter().collect()))
            .collect()
    }
}

impl From<BTreeMap<String, Vec<String>>> for SchemaVersionView {
    fn from(versions: BTreeMap<String, Vec<String>>) -> Self {
        Self::new(versions)
    }
}

/// How long and how often to poll for agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgreementPolicy {
    pub poll_interval: Duration,
    /// `None` waits until agreement or cancellation
    pub timeout: Option<Duration>,
}

impl AgreementPolicy {
    pub fn new(poll_interval: Duration, timeout: Option<Duration>) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Wait with no deadline
    pub fn unbounded() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, None)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for AgreementPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Shared flag that aborts an agreement wait
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Re-arms the flag for the next wait
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementReport {
    pub version: String,
    /// Polls issued, including the one that observed agreement
    pub polls: u64,
    pub waited: Duration,
}

/// Blocks until the cluster reports a single schema version.
///
/// Transport failures end the wait immediately; only disagreement is retried.
pub fn await_agreement<T: SchemaTransport + ?Sized>(
    transport: &mut T,
    policy: &AgreementPolicy,
    cancel: &CancellationFlag,
) -> SchemaResult<AgreementReport> {
    let started = Instant::now();
    let mut polls = 0u64;

    loop {
        let view = SchemaVersionView::from(transport.describe_schema_versions()?);
        polls += 1;

        if let Some(version) = view.agreed_version() {
            tracing::debug!(version, polls, "schema agreement reached");
            return Ok(AgreementReport {
                version: version.to_string(),
                polls,
                waited: started.elapsed(),
            });
        }

        tracing::debug!(
            polls,
            versions = view.version_count(),
            unreachable = view.unreachable_nodes().len(),
            "schema versions disagree"
        );

        if cancel.is_cancelled() {
            return Err(SchemaError::AgreementCancelled { polls });
        }

        let waited = started.elapsed();
        let pause = match policy.timeout {
            Some(timeout) if waited >= timeout => {
                tracing::warn!(
                    polls,
                    waited_ms = waited.as_millis() as u64,
                    versions = view.version_count(),
                    "schema agreement timed out"
                );
                return Err(SchemaError::AgreementTimeout {
                    waited,
                    versions: view.into_map(),
                });
            }
            Some(timeout) => policy.poll_interval.min(timeout - waited),
            None => policy.poll_interval,
        };
        thread::sleep(pause);
    }
}
