use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::contract::model::UserId;
use crate::domain::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }

    /// Text for the blocking progress indicator.
    pub fn progress_label(self) -> &'static str {
        match self {
            MutationKind::Create => "Creating user...",
            MutationKind::Update => "Updating user...",
            MutationKind::Delete => "Deleting user...",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One in-flight mutation intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOp {
    pub ticket: u64,
    pub kind: MutationKind,
    pub target: Option<UserId>,
}

#[derive(Debug, Default)]
struct PendingInner {
    next_ticket: u64,
    ops: BTreeMap<u64, PendingOp>,
}

/// Set of mutations that have been sent and not yet resolved.
///
/// Entries are owned by a [`PendingGuard`]; dropping the guard removes the
/// entry, so a resolved (or abandoned) mutation can never leave one behind.
#[derive(Debug, Default)]
pub struct PendingOperations {
    inner: Mutex<PendingInner>,
}

impl PendingOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mutation. Targeted mutations (update/delete) are rejected
    /// with `Conflict` when another targeted mutation on the same id is in
    /// flight; the check and the insert are one critical section.
    pub fn begin(
        self: &Arc<Self>,
        kind: MutationKind,
        target: Option<UserId>,
    ) -> Result<PendingGuard, SyncError> {
        let mut inner = self.inner.lock();

        if let Some(id) = target {
            if let Some(existing) = inner.ops.values().find(|op| op.target == Some(id)) {
                return Err(SyncError::conflict(id, existing.kind));
            }
        }

        let ticket = inner.next_ticket;
        inner.next_ticket += 1;
        inner.ops.insert(
            ticket,
            PendingOp {
                ticket,
                kind,
                target,
            },
        );

        Ok(PendingGuard {
            set: Arc::clone(self),
            ticket,
        })
    }

    fn finish(&self, ticket: u64) {
        self.inner.lock().ops.remove(&ticket);
    }

    pub fn is_any_pending(&self) -> bool {
        !self.inner.lock().ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ops.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_any_pending()
    }

    pub fn is_pending(&self, kind: MutationKind) -> bool {
        self.inner.lock().ops.values().any(|op| op.kind == kind)
    }

    pub fn kinds(&self) -> BTreeSet<MutationKind> {
        self.inner.lock().ops.values().map(|op| op.kind).collect()
    }

    /// Kind of the mutation currently targeting `id`, if any.
    pub fn pending_for(&self, id: UserId) -> Option<MutationKind> {
        self.inner
            .lock()
            .ops
            .values()
            .find(|op| op.target == Some(id))
            .map(|op| op.kind)
    }

    pub fn snapshot(&self) -> Vec<PendingOp> {
        self.inner.lock().ops.values().copied().collect()
    }

    /// `Creating user... Deleting user...` style label, or None when idle.
    pub fn indicator_label(&self) -> Option<String> {
        let kinds = self.kinds();
        if kinds.is_empty() {
            return None;
        }
        Some(
            kinds
                .into_iter()
                .map(MutationKind::progress_label)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }
}

/// Removes its entry from the pending set when dropped.
#[derive(Debug)]
#[must_use = "dropping the guard immediately resolves the pending entry"]
pub struct PendingGuard {
    set: Arc<PendingOperations>,
    ticket: u64,
}

impl PendingGuard {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.set.finish(self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_track_and_release_entries() {
        let pending = Arc::new(PendingOperations::new());
        assert!(!pending.is_any_pending());
        assert_eq!(pending.indicator_label(), None);

        let create = pending.begin(MutationKind::Create, None).unwrap();
        let delete = pending
            .begin(MutationKind::Delete, Some(UserId(1)))
            .unwrap();

        assert_eq!(pending.len(), 2);
        assert!(pending.is_pending(MutationKind::Create));
        assert!(!pending.is_pending(MutationKind::Update));
        assert_eq!(pending.pending_for(UserId(1)), Some(MutationKind::Delete));
        assert_eq!(
            pending.indicator_label().as_deref(),
            Some("Creating user... Deleting user...")
        );

        drop(create);
        assert_eq!(
            pending.kinds().into_iter().collect::<Vec<_>>(),
            vec![MutationKind::Delete]
        );

        drop(delete);
        assert!(pending.is_empty());
    }

    #[test]
    fn same_target_conflicts_until_released() {
        let pending = Arc::new(PendingOperations::new());
        let update = pending
            .begin(MutationKind::Update, Some(UserId(7)))
            .unwrap();

        let err = pending
            .begin(MutationKind::Delete, Some(UserId(7)))
            .unwrap_err();
        assert_eq!(err, SyncError::conflict(UserId(7), MutationKind::Update));
        assert_eq!(pending.len(), 1, "rejected op is not registered");

        // other ids and creates are unaffected
        let _other = pending
            .begin(MutationKind::Update, Some(UserId(8)))
            .unwrap();
        let _c1 = pending.begin(MutationKind::Create, None).unwrap();
        let _c2 = pending.begin(MutationKind::Create, None).unwrap();

        drop(update);
        assert!(pending
            .begin(MutationKind::Delete, Some(UserId(7)))
            .is_ok());
    }

    #[test]
    fn tickets_are_unique() {
        let pending = Arc::new(PendingOperations::new());
        let a = pending.begin(MutationKind::Create, None).unwrap();
        let b = pending.begin(MutationKind::Create, None).unwrap();
        assert_ne!(a.ticket(), b.ticket());
    }
}
