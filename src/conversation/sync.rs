//! Realtime reconciliation with the hosted store.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::events::{EventBus, WorkspaceEvent};
use crate::storage::{Change, Persistence};
use crate::workspace::Workspace;

/// Feed hosted message pushes into the workspace.
///
/// Returns `None` when the hosted store is not online. Pushes for messages
/// already in the workspace (including our own optimistic appends) are skipped.
async fn spawn_realtime_sync(
    persistence: Arc<Persistence>,
    workspace: Workspace,
    events: EventBus,
) -> Option<JoinHandle<()>> {
    let mut feed = persistence.subscribe().await?;

    Some(tokio::spawn(async move {
        while let Some(remote) = feed.next().await {
            let message_id = remote.message.id.clone();
            if !workspace.apply_remote_message(&remote.chat_id, remote.message) {
                continue;
            }
            tracing::debug!(name: "sync.message.applied", chat_id = %remote.chat_id, message_id = %message_id, "Applied pushed message");
            events.emit(WorkspaceEvent::MessageAdded {
                chat_id: remote.chat_id,
                message_id,
            });
            persistence.persist(Change::LocalOnly).await;
        }
        tracing::info!("Realtime sync stopped");
    }))
}

/// Owns the running sync task so it can follow the user across settings changes.
#[derive(Debug, Clone)]
pub struct RealtimeSync {
    persistence: Arc<Persistence>,
    workspace: Workspace,
    events: EventBus,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RealtimeSync {
    #[must_use]
    pub fn new(persistence: Arc<Persistence>, workspace: Workspace, events: EventBus) -> Self {
        Self {
            persistence,
            workspace,
            events,
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Stop the current feed and subscribe again for the active user.
    ///
    /// Returns whether a feed is now running.
    pub async fn restart(&self) -> bool {
        if let Some(previous) = self.task.lock().unwrap().take() {
            previous.abort();
        }

        let handle = spawn_realtime_sync(
            Arc::clone(&self.persistence),
            self.workspace.clone(),
            self.events.clone(),
        )
        .await;
        let running = handle.is_some();
        *self.task.lock().unwrap() = handle;
        if running {
            tracing::info!(name: "sync.started", "Realtime sync started");
        }
        running
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}
