//! Node lock/unlock/completion state machine and its save round-trip.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    KEY_ACTIVE_NODE, KEY_CAR_NODE, KEY_COMPLETED_SUFFIX, KEY_NODE_PREFIX, KEY_UNLOCKED_SUFFIX,
};
use crate::events::Outbox;
use crate::numbers::i64_to_index;
use crate::store::PersistentStore;

/// Position of a node in the fixed linear course sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// The following node, without range checking.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// The preceding node, or `None` for node 0.
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        match self.0.checked_sub(1) {
            Some(index) => Some(Self(index)),
            None => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

impl From<usize> for NodeId {
    fn from(value: usize) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Locked,
    Unlocked,
    Completed,
}

impl NodeStatus {
    /// Unlocked or completed; the node may be visited.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Unlocked | Self::Completed)
    }
}

/// Plain-data view of the whole progression, used for saves, reports and
/// equality checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub unlocked: Vec<bool>,
    pub completed: Vec<bool>,
    pub active_node: NodeId,
    pub car_node: NodeId,
}

impl ProgressSnapshot {
    /// First-run state: node 0 unlocked, everything else locked.
    #[must_use]
    pub fn fresh(node_count: usize) -> Self {
        let node_count = node_count.max(1);
        let mut unlocked = vec![false; node_count];
        unlocked[0] = true;
        Self {
            unlocked,
            completed: vec![false; node_count],
            active_node: NodeId(0),
            car_node: NodeId(0),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.completed.len()
    }

    #[must_use]
    pub fn status(&self, id: NodeId) -> NodeStatus {
        let idx = id.index();
        if self.completed.get(idx).copied().unwrap_or(false) {
            NodeStatus::Completed
        } else if self.unlocked.get(idx).copied().unwrap_or(false) {
            NodeStatus::Unlocked
        } else {
            NodeStatus::Locked
        }
    }

    /// Rebuild a snapshot that honours the ordering invariants.
    ///
    /// Completion is truncated to its contiguous prefix from node 0, the
    /// unlock flags are derived from it, and both pointers are clamped into
    /// the reachable range.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let node_count = self.node_count().max(1);
        let prefix = self
            .completed
            .iter()
            .take(node_count)
            .take_while(|done| **done)
            .count();
        let completed: Vec<bool> = (0..node_count).map(|i| i < prefix).collect();
        let unlocked: Vec<bool> = (0..node_count).map(|i| i <= prefix).collect();
        let active_node = NodeId(prefix.min(node_count - 1));
        let car_node = NodeId(self.car_node.index().min(active_node.index()));
        Self {
            unlocked,
            completed,
            active_node,
            car_node,
        }
    }

    /// Check both ordering invariants and the pointer rules.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let n = self.node_count();
        if n == 0 || self.unlocked.len() != n || !self.unlocked[0] {
            return false;
        }
        let completed_implies_unlocked = (0..n).all(|i| !self.completed[i] || self.unlocked[i]);
        let ordered = (1..n).all(|i| !self.unlocked[i] || self.completed[i - 1]);
        let frontier = (0..n).find(|&i| !self.completed[i]).unwrap_or(n - 1);
        completed_implies_unlocked
            && ordered
            && self.active_node.index() == frontier
            && self.car_node.index() <= frontier
    }
}

/// Change notifications raised by [`ProgressionState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressionEvent {
    NodeCompleted {
        node: NodeId,
        /// The node that became unlocked, `None` when the final node finished.
        unlocked: Option<NodeId>,
    },
    Reset,
}

/// Unlock/completion state machine for the course, bound to its store.
///
/// Every mutation is persisted before the corresponding event is queued, so
/// anything reacting to the event reads consistent data from the store.
#[derive(Debug)]
pub struct ProgressionState<S: PersistentStore> {
    store: S,
    snapshot: ProgressSnapshot,
    events: Outbox<ProgressionEvent>,
}

impl<S: PersistentStore> ProgressionState<S> {
    /// Build the session state from whatever the store holds.
    pub fn load(store: S, node_count: usize) -> Self {
        let mut state = Self {
            store,
            snapshot: ProgressSnapshot::fresh(node_count),
            events: Outbox::new(),
        };
        state.reload();
        state
    }

    /// Re-read every field from the store, substituting defaults per field.
    pub fn reload(&mut self) {
        let node_count = self.snapshot.node_count();
        let raw = self.read_raw(node_count);
        let sanitized = raw.sanitized();
        if sanitized != raw {
            log::warn!(
                "progress save was inconsistent; repaired to active {} car {}",
                sanitized.active_node,
                sanitized.car_node
            );
            self.snapshot = sanitized;
            self.save();
        } else {
            self.snapshot = sanitized;
        }
        log::debug!(
            "progress loaded: {}/{} completed, active {}, car {}",
            self.completed_count(),
            node_count,
            self.snapshot.active_node,
            self.snapshot.car_node
        );
    }

    fn read_raw(&self, node_count: usize) -> ProgressSnapshot {
        let mut raw = ProgressSnapshot::fresh(node_count);
        for i in 0..node_count {
            if let Some(flag) = self.store.get_bool(&unlocked_key(i)) {
                raw.unlocked[i] = flag;
            }
            if let Some(flag) = self.store.get_bool(&completed_key(i)) {
                raw.completed[i] = flag;
            }
        }
        let read_pointer = |key: &str| {
            self.store
                .get_int(key)
                .and_then(i64_to_index)
                .map_or(NodeId(0), NodeId)
        };
        raw.active_node = read_pointer(KEY_ACTIVE_NODE);
        raw.car_node = read_pointer(KEY_CAR_NODE);
        raw
    }

    /// Persist every field. Write failures are logged; the in-memory state
    /// stays authoritative for the rest of the session.
    pub fn save(&mut self) {
        if let Err(err) = self.write_all() {
            log::error!("failed to persist progress: {err}");
        }
    }

    fn write_all(&mut self) -> Result<(), S::Error> {
        for i in 0..self.snapshot.node_count() {
            self.store
                .set_bool(&unlocked_key(i), self.snapshot.unlocked[i])?;
            self.store
                .set_bool(&completed_key(i), self.snapshot.completed[i])?;
        }
        self.store
            .set_int(KEY_ACTIVE_NODE, index_to_i64(self.snapshot.active_node))?;
        self.store
            .set_int(KEY_CAR_NODE, index_to_i64(self.snapshot.car_node))?;
        self.store.flush()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.snapshot.node_count()
    }

    /// Whether `id` names a node of this course.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.node_count()
    }

    #[must_use]
    pub fn status(&self, id: NodeId) -> NodeStatus {
        self.snapshot.status(id)
    }

    /// True for unlocked and completed nodes; false for anything out of range.
    #[must_use]
    pub fn is_unlocked(&self, id: NodeId) -> bool {
        self.status(id).is_open()
    }

    #[must_use]
    pub fn is_completed(&self, id: NodeId) -> bool {
        self.status(id) == NodeStatus::Completed
    }

    /// The frontier: first node not yet completed, or the last node.
    #[must_use]
    pub const fn active_node(&self) -> NodeId {
        self.snapshot.active_node
    }

    /// Node the avatar last came to rest on.
    #[must_use]
    pub const fn car_node(&self) -> NodeId {
        self.snapshot.car_node
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.snapshot.completed.iter().filter(|done| **done).count()
    }

    /// Every node in the course is completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.snapshot.completed.iter().all(|done| *done)
    }

    #[must_use]
    pub const fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mark `id` completed and unlock its successor.
    ///
    /// Returns `true` when the call changed state. Completing an already
    /// completed node, a locked node, or an unknown node is a no-op.
    pub fn complete(&mut self, id: NodeId) -> bool {
        match self.status(id) {
            NodeStatus::Completed => {
                log::debug!("{id} already completed");
                return false;
            }
            NodeStatus::Locked => {
                log::warn!("ignoring completion of locked or unknown {id}");
                return false;
            }
            NodeStatus::Unlocked => {}
        }

        let idx = id.index();
        self.snapshot.completed[idx] = true;
        let next = id.next();
        let unlocked = if self.contains(next) && self.prefix_completed_through(idx) {
            self.snapshot.unlocked[next.index()] = true;
            self.snapshot.active_node = next;
            Some(next)
        } else {
            None
        };
        self.save();
        log::info!(
            "{id} completed; {}",
            unlocked.map_or_else(|| "course finished".to_string(), |n| format!("{n} unlocked"))
        );
        self.events
            .push(ProgressionEvent::NodeCompleted { node: id, unlocked });
        true
    }

    fn prefix_completed_through(&self, idx: usize) -> bool {
        self.snapshot.completed[..=idx].iter().all(|done| *done)
    }

    /// Record where the avatar came to rest. Lock state is untouched.
    ///
    /// Returns `true` when the stored car node changed.
    pub fn set_car_node(&mut self, id: NodeId) -> bool {
        if !self.is_unlocked(id) {
            log::warn!("ignoring car placement on locked or unknown {id}");
            return false;
        }
        if self.snapshot.car_node == id {
            return false;
        }
        self.snapshot.car_node = id;
        self.save();
        true
    }

    /// Restore first-run state and persist it.
    pub fn reset(&mut self) {
        self.snapshot = ProgressSnapshot::fresh(self.node_count());
        self.save();
        log::info!("progress reset");
        self.events.push(ProgressionEvent::Reset);
    }

    /// Take the notifications raised since the last drain.
    pub fn drain_events(&mut self) -> Vec<ProgressionEvent> {
        self.events.drain()
    }
}

fn unlocked_key(index: usize) -> String {
    format!("{KEY_NODE_PREFIX}{index}{KEY_UNLOCKED_SUFFIX}")
}

fn completed_key(index: usize) -> String {
    format!("{KEY_NODE_PREFIX}{index}{KEY_COMPLETED_SUFFIX}")
}

fn index_to_i64(id: NodeId) -> i64 {
    i64::try_from(id.index()).unwrap_or(i64::MAX)
}
