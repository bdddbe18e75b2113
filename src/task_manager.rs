//! Named groups of background tasks.
//!
//! The relay runs two groups, "server" and "scheduler", each with its own
//! shutdown receiver so `App` can stop them one after the other.
use futures::future::join_all;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

struct TrackedTask {
    name: &'static str,
    handle: JoinHandle<()>,
}

/// Tasks started under one group name, stopped by one watch signal.
#[derive(Clone)]
pub struct TaskManager {
    group: &'static str,
    tasks: Arc<Mutex<Vec<TrackedTask>>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TaskManager {
    pub fn new(group: &'static str, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            group,
            tasks: Arc::new(Mutex::new(Vec::new())),
            shutdown_rx,
        }
    }

    /// Starts `future` on the runtime and remembers it under `task_name`.
    pub fn spawn<F>(&self, task_name: &'static str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(group = self.group, task_name, "Spawning task");
        let handle = tokio::spawn(future);
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TrackedTask {
                name: task_name,
                handle,
            });
    }

    /// The group's shutdown signal, for tasks that must watch it.
    pub fn get_shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    /// Joins every task of the group. Returns how many of them panicked.
    ///
    /// This does not send the shutdown signal; the owner of the sender does.
    pub async fn shutdown(self) -> usize {
        let tasks: Vec<TrackedTask> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        info!(group = self.group, tasks = tasks.len(), "Joining tasks");

        let (names, handles): (Vec<_>, Vec<_>) =
            tasks.into_iter().map(|t| (t.name, t.handle)).unzip();
        let results = join_all(handles).await;

        let panicked = names
            .into_iter()
            .zip(results)
            .filter(|(task_name, result)| match result {
                Ok(()) => {
                    debug!(task_name, "Task finished");
                    false
                }
                Err(e) => {
                    error!(task_name, error = %e, "Task panicked");
                    true
                }
            })
            .count();

        if panicked == 0 {
            info!(group = self.group, "All tasks finished");
        }
        panicked
    }
}

impl std::fmt::Debug for TaskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}
