#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use users_admin::contract::{
    client::UsersRemote,
    error::RemoteError,
    model::{RemoteUser, User, UserDraft, UserId},
};
use users_admin::domain::{ManualClock, UsersSession};
use users_admin::UsersAdminConfig;

pub fn user(id: u64, name: &str, email: &str, company: &str) -> User {
    UserDraft::new(name, email, company).into_user(UserId(id))
}

pub fn ann() -> User {
    user(1, "Ann", "a@x.com", "Acme")
}

/// Remote whose answers are scripted by the test. Mutations can be held in
/// flight until the test releases them.
#[derive(Default)]
pub struct ScriptedRemote {
    users: Mutex<Vec<User>>,
    calls: Mutex<Vec<String>>,
    list_failures: AtomicU32,
    fail_mutations: AtomicBool,
    echo_id: Mutex<Option<UserId>>,
    gate: Mutex<Option<Arc<Notify>>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
}

impl ScriptedRemote {
    pub fn with_users(users: Vec<User>) -> Arc<Self> {
        let remote = Self::default();
        *remote.users.lock() = users;
        Arc::new(remote)
    }

    /// The next `n` list calls fail with HTTP 503.
    pub fn fail_next_lists(&self, n: u32) {
        self.list_failures.store(n, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.fail_mutations.store(fail, Ordering::SeqCst);
    }

    /// Id echoed back from create/update; `None` omits it.
    pub fn echo_id(&self, id: Option<UserId>) {
        *self.echo_id.lock() = id;
    }

    /// Hold every mutation until the returned handle is notified.
    pub fn hold_mutations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Hold every list call until the returned handle is notified.
    pub fn hold_lists(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn mutation_calls(&self) -> usize {
        self.calls().iter().filter(|c| c.as_str() != "list").count()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    async fn wait_gate(&self) {
        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn mutation_result(&self) -> Result<(), RemoteError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            Err(RemoteError::status(500))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UsersRemote for ScriptedRemote {
    async fn list_users(&self) -> Result<Vec<User>, RemoteError> {
        self.record("list".to_string());
        let gate = self.list_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let remaining = self.list_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.list_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(RemoteError::status(503));
        }
        Ok(self.users.lock().clone())
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        self.record("create".to_string());
        self.wait_gate().await;
        self.mutation_result()?;
        Ok(RemoteUser {
            id: *self.echo_id.lock(),
            fields: draft.clone().into_patch(),
        })
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<RemoteUser, RemoteError> {
        self.record(format!("update {id}"));
        self.wait_gate().await;
        self.mutation_result()?;
        Ok(RemoteUser {
            id: Some(id),
            fields: draft.clone().into_patch(),
        })
    }

    async fn delete_user(&self, id: UserId) -> Result<(), RemoteError> {
        self.record(format!("delete {id}"));
        self.wait_gate().await;
        self.mutation_result()
    }
}

pub fn session_with(remote: Arc<ScriptedRemote>) -> (Arc<ManualClock>, UsersSession) {
    let clock = Arc::new(ManualClock::default());
    let session = UsersSession::with_clock(remote, clock.clone(), &UsersAdminConfig::default());
    (clock, session)
}

/// Session whose cache already holds the remote's users.
pub async fn loaded_session(users: Vec<User>) -> (Arc<ScriptedRemote>, UsersSession) {
    let remote = ScriptedRemote::with_users(users);
    let (_, session) = session_with(remote.clone());
    session.refresh().await.expect("initial fetch");
    (remote, session)
}
