use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::contract::{
    error::RemoteError,
    model::{User, UserDraft, UserId, UserPatch},
};
use crate::domain::clock::Clock;
use crate::domain::error::SyncError;

/// Lifecycle of the cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Empty,
    Loading,
    Fresh,
    Stale,
    Error,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Empty => "empty",
            CacheStatus::Loading => "loading",
            CacheStatus::Fresh => "fresh",
            CacheStatus::Stale => "stale",
            CacheStatus::Error => "error",
        }
    }
}

/// Stored phase; `Stale` is never stored, it is derived from the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Empty,
    Loading,
    Fetched,
    Error,
}

#[derive(Debug)]
struct CacheState {
    records: Vec<User>,
    phase: Phase,
    last_fetched_at: Option<DateTime<Utc>>,
    last_error: Option<RemoteError>,
    /// Phase to go back to if the load in progress is abandoned.
    loading_from: Option<Phase>,
    /// Strictly greater than every id this cache has ever held; `None` once
    /// an id of `u64::MAX` has been seen.
    next_local_id: Option<u64>,
}

impl CacheState {
    fn position(&self, id: UserId) -> Option<usize> {
        self.records.iter().position(|u| u.id == id)
    }

    fn observe_id(&mut self, id: UserId) {
        self.next_local_id = match (self.next_local_id, id.0.checked_add(1)) {
            (Some(next), Some(after)) => Some(next.max(after)),
            _ => None,
        };
    }

    /// Next id from the counter. With the counter exhausted, the lowest id
    /// not currently held is used instead.
    fn allocate_id(&mut self) -> UserId {
        let id = match self.next_local_id {
            Some(next) => UserId(next),
            None => {
                let free = (1..=u64::MAX)
                    .map(UserId)
                    .find(|id| self.position(*id).is_none())
                    .unwrap_or(UserId(0));
                warn!(local_id = %free, "Local id counter exhausted, reusing a free id");
                free
            }
        };
        self.observe_id(id);
        id
    }
}

/// Session-lifetime copy of the last known server collection.
///
/// Every mutation takes the write lock for its whole duration, so readers
/// see either the state before or after an apply, never a partial one.
pub struct UsersCache {
    state: RwLock<CacheState>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
}

impl UsersCache {
    pub fn new(clock: Arc<dyn Clock>, freshness_window: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                records: Vec::new(),
                phase: Phase::Empty,
                last_fetched_at: None,
                last_error: None,
                loading_from: None,
                next_local_id: Some(1),
            }),
            clock,
            freshness_window,
        }
    }

    /// Wholesale replace after a successful list fetch. Duplicate ids in the
    /// incoming list are dropped (first occurrence wins).
    pub fn replace_all(&self, records: Vec<User>) {
        let now = self.clock.now();
        let mut state = self.state.write();

        let mut unique: Vec<User> = Vec::with_capacity(records.len());
        for user in records {
            if unique.iter().any(|u| u.id == user.id) {
                warn!(user_id = %user.id, "Dropping duplicate id from fetched list");
                continue;
            }
            state.observe_id(user.id);
            unique.push(user);
        }

        debug!(count = unique.len(), "Cache replaced");
        state.records = unique;
        state.phase = Phase::Fetched;
        state.loading_from = None;
        state.last_fetched_at = Some(now);
        state.last_error = None;
    }

    pub fn mark_loading(&self) {
        let mut state = self.state.write();
        if state.phase != Phase::Loading {
            state.loading_from = Some(state.phase);
        }
        state.phase = Phase::Loading;
    }

    /// Undo `mark_loading` for a load that will never complete.
    pub fn abandon_loading(&self) {
        let mut state = self.state.write();
        if state.phase == Phase::Loading {
            state.phase = state.loading_from.take().unwrap_or(Phase::Empty);
            debug!(phase = ?state.phase, "Abandoned load");
        }
    }

    /// Records are kept: stale data beats no data.
    pub fn mark_error(&self, err: RemoteError) {
        let mut state = self.state.write();
        state.phase = Phase::Error;
        state.loading_from = None;
        state.last_error = Some(err);
    }

    /// Append a newly created record under a locally allocated id. Ids the
    /// remote echoes are never used, so an id is not handed out twice in a
    /// session. Allocation and append happen under one lock.
    pub fn apply_create(&self, draft: UserDraft) -> User {
        let mut state = self.state.write();
        let id = state.allocate_id();
        let user = draft.into_user(id);
        state.records.push(user.clone());
        user
    }

    /// Merge `patch` over the record with `id`, preserving the id.
    pub fn apply_update(&self, id: UserId, patch: UserPatch) -> Result<User, SyncError> {
        let mut state = self.state.write();
        let pos = state.position(id).ok_or_else(|| SyncError::not_found(id))?;
        let user = &mut state.records[pos];
        user.apply_patch(patch);
        Ok(user.clone())
    }

    pub fn apply_delete(&self, id: UserId) -> Result<User, SyncError> {
        let mut state = self.state.write();
        let pos = state.position(id).ok_or_else(|| SyncError::not_found(id))?;
        Ok(state.records.remove(pos))
    }

    /// `now - last_fetched_at > freshness_window`. A cache that was never
    /// fetched is stale.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.read();
        Self::stale_at(state.last_fetched_at, now, self.freshness_window)
    }

    fn stale_at(last: Option<DateTime<Utc>>, now: DateTime<Utc>, window: Duration) -> bool {
        match last {
            None => true,
            // negative age (clock went backwards) is not stale
            Some(at) => (now - at).to_std().is_ok_and(|age| age > window),
        }
    }

    pub fn status(&self) -> CacheStatus {
        let now = self.clock.now();
        let state = self.state.read();
        match state.phase {
            Phase::Empty => CacheStatus::Empty,
            Phase::Loading => CacheStatus::Loading,
            Phase::Error => CacheStatus::Error,
            Phase::Fetched => {
                if Self::stale_at(state.last_fetched_at, now, self.freshness_window) {
                    CacheStatus::Stale
                } else {
                    CacheStatus::Fresh
                }
            }
        }
    }

    pub fn last_error(&self) -> Option<RemoteError> {
        self.state.read().last_error.clone()
    }

    pub fn last_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_fetched_at
    }

    pub fn get(&self, id: UserId) -> Option<User> {
        let state = self.state.read();
        state.position(id).map(|pos| state.records[pos].clone())
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().records.is_empty()
    }

    pub fn snapshot(&self) -> Vec<User> {
        self.state.read().records.clone()
    }

    /// Run `f` against the current records under the read lock.
    pub fn with_records<R>(&self, f: impl FnOnce(&[User]) -> R) -> R {
        f(&self.state.read().records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::ManualClock;
    use std::collections::HashSet;

    fn user(id: u64, name: &str) -> User {
        UserDraft::new(name, format!("{}@x.com", name.to_lowercase()), "Acme")
            .into_user(UserId(id))
    }

    fn cache() -> (Arc<ManualClock>, UsersCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = UsersCache::new(clock.clone(), Duration::from_secs(300));
        (clock, cache)
    }

    fn assert_unique_ids(cache: &UsersCache) {
        let ids: Vec<UserId> = cache.snapshot().iter().map(|u| u.id).collect();
        let set: HashSet<UserId> = ids.iter().copied().collect();
        assert_eq!(ids.len(), set.len(), "duplicate ids in {ids:?}");
    }

    #[test]
    fn starts_empty() {
        let (_, cache) = cache();
        assert_eq!(cache.status(), CacheStatus::Empty);
        assert!(cache.is_empty());
        assert!(cache.last_fetched_at().is_none());
    }

    #[test]
    fn replace_all_marks_fresh_then_stale_after_window() {
        let (clock, cache) = cache();
        cache.mark_loading();
        assert_eq!(cache.status(), CacheStatus::Loading);

        cache.replace_all(vec![user(1, "Ann"), user(2, "Bob")]);
        assert_eq!(cache.status(), CacheStatus::Fresh);
        assert_eq!(cache.len(), 2);

        clock.advance(chrono::Duration::seconds(300));
        assert_eq!(cache.status(), CacheStatus::Fresh, "window is exclusive");

        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(cache.status(), CacheStatus::Stale);
        assert!(cache.is_stale(clock.now()));
    }

    #[test]
    fn never_fetched_is_stale() {
        let (clock, cache) = cache();
        assert!(cache.is_stale(clock.now()));
    }

    #[test]
    fn mark_error_keeps_records() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann")]);
        cache.mark_loading();
        cache.mark_error(RemoteError::status(503));

        assert_eq!(cache.status(), CacheStatus::Error);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.last_error(), Some(RemoteError::status(503)));
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann"), user(1, "Impostor"), user(2, "Bob")]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(UserId(1)).unwrap().name, "Ann");
    }

    #[test]
    fn create_allocates_above_every_seen_id() {
        let (_, cache) = cache();
        cache.replace_all((1..=10).map(|i| user(i, "U")).collect());

        let a = cache.apply_create(UserDraft::new("A", "a@x", "Co"));
        let b = cache.apply_create(UserDraft::new("B", "b@x", "Co"));

        assert_eq!(a.id, UserId(11));
        assert_eq!(b.id, UserId(12));
        assert_eq!(cache.snapshot().last().unwrap(), &b);
        assert_eq!(cache.len(), 12);
        assert_unique_ids(&cache);
    }

    #[test]
    fn create_after_max_id_still_yields_unique_ids() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann"), user(u64::MAX, "Last")]);

        let a = cache.apply_create(UserDraft::new("A", "a@x", "Co"));
        let b = cache.apply_create(UserDraft::new("B", "b@x", "Co"));

        assert_ne!(a.id, UserId(u64::MAX));
        assert_ne!(b.id, UserId(u64::MAX));
        assert_ne!(a.id, b.id);
        assert_eq!(cache.len(), 4);
        assert_unique_ids(&cache);
    }

    #[test]
    fn abandoned_load_restores_previous_phase() {
        let (_, cache) = cache();
        cache.mark_loading();
        cache.abandon_loading();
        assert_eq!(cache.status(), CacheStatus::Empty);

        cache.replace_all(vec![user(1, "Ann")]);
        cache.mark_loading();
        cache.mark_loading();
        cache.abandon_loading();
        assert_eq!(cache.status(), CacheStatus::Fresh);

        // nothing to undo once the load has finished
        cache.mark_loading();
        cache.mark_error(RemoteError::status(503));
        cache.abandon_loading();
        assert_eq!(cache.status(), CacheStatus::Error);
    }

    #[test]
    fn local_ids_are_never_reused_after_delete() {
        let (_, cache) = cache();
        let a = cache.apply_create(UserDraft::new("A", "a@x", "Co"));
        cache.apply_delete(a.id).unwrap();
        let b = cache.apply_create(UserDraft::new("B", "b@x", "Co"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn update_merges_and_preserves_id() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann"), user(2, "Bob")]);

        let updated = cache
            .apply_update(
                UserId(2),
                UserPatch {
                    name: Some("Robert".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, UserId(2));
        assert_eq!(updated.name, "Robert");
        assert_eq!(updated.email, "bob@x.com");
        assert_eq!(cache.snapshot()[1], updated, "position is preserved");
    }

    #[test]
    fn update_and_delete_report_not_found() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann")]);

        assert_eq!(
            cache.apply_update(UserId(9), UserPatch::default()),
            Err(SyncError::not_found(UserId(9)))
        );
        assert_eq!(
            cache.apply_delete(UserId(9)),
            Err(SyncError::not_found(UserId(9)))
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn mutations_do_not_change_status() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(1, "Ann")]);
        cache.apply_create(UserDraft::new("Bo", "bo@x.com", "Co"));
        cache.apply_delete(UserId(1)).unwrap();
        assert_eq!(cache.status(), CacheStatus::Fresh);
    }

    #[test]
    fn arbitrary_mutation_sequences_keep_ids_unique() {
        let (_, cache) = cache();
        cache.replace_all(vec![user(3, "C"), user(7, "G")]);
        for step in 0u64..60 {
            match step % 5 {
                0 => {
                    cache.replace_all(cache.snapshot());
                }
                1 => {
                    cache.apply_create(UserDraft::new("M", "m@x", "Co"));
                }
                2 => {
                    let _ = cache.apply_delete(UserId(step % 11));
                }
                3 => {
                    let _ = cache.apply_update(UserId(step % 13), UserPatch::default());
                }
                _ => {
                    cache.apply_create(UserDraft::new("D", "d@x", "Co"));
                }
            }
            assert_unique_ids(&cache);
        }
    }
}
