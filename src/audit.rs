use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::resource::Resource;

/// What one rule source said during a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allow,
    Deny,
    Abstain,
    /// The provider failed; treated as abstain.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Token restrictions, an allow-block scope, or a provider name.
    pub source: String,
    pub outcome: Outcome,
}

impl TraceStep {
    pub fn new(source: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            source: source.into(),
            outcome,
        }
    }
}

/// A record of one permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp of the check.
    pub when: String,
    pub actor: Option<Actor>,
    pub action: String,
    pub resource: Resource,
    pub allowed: bool,
    /// No rule source decided, the action's default was used.
    pub used_default: bool,
    pub decided_by: String,
    pub trace: Vec<TraceStep>,
}

/// A bounded in-memory log of recent permission checks. The oldest entry is
/// evicted once the capacity is reached.
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&self, entry: AuditEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Returns up to `n` entries, most recent first.
    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        self.lock().iter().rev().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock can only happen between whole-entry
    // operations, so the buffer is still consistent.
    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
