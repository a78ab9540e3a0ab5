use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::config::UsersAdminConfig;
use crate::contract::client::UsersRemote;
use crate::domain::cache::{CacheStatus, UsersCache};
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::coordinator::MutationCoordinator;
use crate::domain::error::SyncError;
use crate::domain::pending::PendingOperations;
use crate::domain::projection::{Projection, TableView};

/// One operator session: owns the cache, the pending set, the coordinator
/// and the table controls. Built once and shared by reference.
pub struct UsersSession {
    remote: Arc<dyn UsersRemote>,
    cache: Arc<UsersCache>,
    pending: Arc<PendingOperations>,
    coordinator: MutationCoordinator,
    view: Mutex<TableView>,
    fetch_retries: u32,
}

impl UsersSession {
    pub fn new(remote: Arc<dyn UsersRemote>, config: &UsersAdminConfig) -> Self {
        Self::with_clock(remote, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        remote: Arc<dyn UsersRemote>,
        clock: Arc<dyn Clock>,
        config: &UsersAdminConfig,
    ) -> Self {
        let cache = Arc::new(UsersCache::new(clock, config.freshness_window));
        let pending = Arc::new(PendingOperations::new());
        let coordinator =
            MutationCoordinator::new(remote.clone(), cache.clone(), pending.clone());
        Self {
            remote,
            cache,
            pending,
            coordinator,
            view: Mutex::new(TableView::new(
                config.page_size,
                config.page_size_options.clone(),
            )),
            fetch_retries: config.fetch_retries,
        }
    }

    pub fn cache(&self) -> &Arc<UsersCache> {
        &self.cache
    }

    pub fn pending(&self) -> &Arc<PendingOperations> {
        &self.pending
    }

    pub fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }

    /// Fetch the whole collection, retrying up to `fetch_retries` times.
    /// On failure the cache goes to `error` and keeps what it had.
    #[instrument(name = "users_admin.session.refresh", skip(self))]
    pub async fn refresh(&self) -> Result<usize, SyncError> {
        self.cache.mark_loading();
        let loading = LoadingGuard {
            cache: &self.cache,
            settled: false,
        };

        let mut attempt = 0;
        let result = loop {
            match self.remote.list_users().await {
                Ok(users) => break Ok(users),
                Err(e) if attempt < self.fetch_retries => {
                    attempt += 1;
                    warn!(error = %e, attempt, "List fetch failed, retrying");
                }
                Err(e) => break Err(e),
            }
        };

        loading.settle();
        match result {
            Ok(users) => {
                self.cache.replace_all(users);
                let count = self.cache.len();
                info!(count, "Users loaded");
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load users");
                self.cache.mark_error(e.clone());
                Err(SyncError::fetch_failed(e))
            }
        }
    }

    /// Refetch when the cache is empty, stale or in error. Returns whether a
    /// fetch happened.
    #[instrument(name = "users_admin.session.ensure_fresh", skip(self))]
    pub async fn ensure_fresh(&self) -> Result<bool, SyncError> {
        match self.cache.status() {
            CacheStatus::Fresh | CacheStatus::Loading => Ok(false),
            CacheStatus::Empty | CacheStatus::Stale | CacheStatus::Error => {
                self.refresh().await.map(|_| true)
            }
        }
    }

    /// Current page, re-derived from the cache on every call.
    pub fn project(&self) -> Projection {
        let view = self.view.lock();
        self.cache.with_records(|records| view.project(records))
    }

    pub fn view(&self) -> TableView {
        self.view.lock().clone()
    }

    pub fn set_search(&self, term: impl Into<String>) {
        self.view.lock().set_search(term);
    }

    pub fn clear_search(&self) {
        self.view.lock().clear_search();
    }

    pub fn set_page(&self, page: usize) {
        self.view.lock().set_page(page);
    }

    pub fn set_page_size(&self, page_size: usize) -> bool {
        self.view.lock().set_page_size(page_size)
    }
}

/// Puts the cache back to its previous phase if a refresh is dropped
/// before the fetch settles.
struct LoadingGuard<'a> {
    cache: &'a UsersCache,
    settled: bool,
}

impl LoadingGuard<'_> {
    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Refresh dropped before completion");
            self.cache.abandon_loading();
        }
    }
}
