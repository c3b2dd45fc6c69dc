//! Cancellable per-user background tasks.
//!
//! Used for the match retry loop and the disconnect grace timer. At most one
//! task is outstanding per user; scheduling a new one aborts the previous.
//! Cancelling a task that already finished is a no-op.

use std::{collections::HashMap, future::Future};

use tokio::{sync::Mutex, task::AbortHandle};

use crate::domain::UserId;

pub struct TaskScheduler {
    name: &'static str,
    tasks: Mutex<HashMap<UserId, AbortHandle>>,
}

impl TaskScheduler {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn `task` for `user_id`, replacing any task already scheduled for them
    pub async fn schedule<F>(&self, user_id: UserId, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|_, handle| !handle.is_finished());

        let handle = tokio::spawn(task).abort_handle();
        if let Some(previous) = tasks.insert(user_id.clone(), handle) {
            previous.abort();
        }
        tracing::debug!("[{}] scheduled task for '{}'", self.name, user_id);
    }

    /// Abort the task of `user_id`; returns `true` if a live task was aborted
    pub async fn cancel(&self, user_id: &UserId) -> bool {
        let handle = self.tasks.lock().await.remove(user_id);
        match handle {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                tracing::debug!("[{}] cancelled task for '{}'", self.name, user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn is_scheduled(&self, user_id: &UserId) -> bool {
        self.tasks
            .lock()
            .await
            .get(user_id)
            .is_some_and(|handle| !handle.is_finished())
    }
}
