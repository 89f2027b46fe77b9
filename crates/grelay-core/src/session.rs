use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{domain::UserId, registry::Destination};

/// Per-operator routing state: which destination auto-relay currently targets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperatorSession {
    pub active: Option<Destination>,
}

impl OperatorSession {
    pub fn active_alias(&self) -> Option<&str> {
        self.active.as_ref().map(|d| d.alias.as_str())
    }
}

/// Keyed store of operator sessions.
///
/// Memory-resident only. The map lock is held for the duration of a single
/// read or write and never across a transport call; callers that need a
/// read-then-act sequence to be ordered take an [`OperatorLocks`] guard first.
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<UserId, OperatorSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the operator's session (default if none exists yet).
    pub async fn get(&self, user: UserId) -> OperatorSession {
        self.inner
            .lock()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set_active(&self, user: UserId, dest: Destination) {
        let mut map = self.inner.lock().await;
        map.entry(user).or_default().active = Some(dest);
    }

    pub async fn clear_active(&self, user: UserId) {
        let mut map = self.inner.lock().await;
        map.entry(user).or_default().active = None;
    }
}

/// One async mutex per operator, used to sequence that operator's events.
#[derive(Default)]
pub struct OperatorLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl OperatorLocks {
    pub async fn lock_operator(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(user)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
