//! Hosted history integration tests: activation, realtime pushes and the
//! fallback to local-only storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use prisma_chat::config::HostedConfig;
use prisma_chat::conversation::RealtimeSync;
use prisma_chat::domain::{Chat, Message, Project, Settings};
use prisma_chat::events::EventBus;
use prisma_chat::storage::{
    Change, HistoryStore, HostedStore, LocalStore, Persistence, RemoteMessage, StorageError,
    StorageMode, UserProfile,
};
use prisma_chat::workspace::Workspace;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn memory_config() -> HostedConfig {
    HostedConfig {
        url: "mem://".to_string(),
        namespace: "test".to_string(),
        database: "test".to_string(),
        username: None,
        password: None,
    }
}

fn settings_for(user: &str) -> Settings {
    Settings {
        external_user_id: user.to_string(),
        ..Settings::default()
    }
}

async fn persistence(
    dir: &TempDir,
    remote: Option<Arc<dyn HistoryStore>>,
    hosted: Option<HostedConfig>,
    workspace: &Workspace,
) -> Arc<Persistence> {
    let local = LocalStore::open(dir.path()).await.unwrap();
    Arc::new(Persistence::new(
        local,
        remote,
        hosted,
        workspace.clone(),
        EventBus::new(64),
    ))
}

/// Hosted store that loads empty history and refuses message writes.
#[derive(Debug, Default)]
struct RefusingStore {
    message_writes: AtomicUsize,
    fail_loads: bool,
}

fn refused() -> StorageError {
    StorageError::Io(std::io::Error::other("connection reset by peer"))
}

#[async_trait]
impl HistoryStore for RefusingStore {
    async fn upsert_user(&self, _profile: &UserProfile) -> Result<(), StorageError> {
        Ok(())
    }

    async fn load_chats(&self, _user_id: &str) -> Result<Vec<Chat>, StorageError> {
        if self.fail_loads {
            return Err(refused());
        }
        Ok(Vec::new())
    }

    async fn upsert_chat(&self, _user_id: &str, _chat: &Chat) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete_chat(&self, _chat_id: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn insert_message(
        &self,
        _user_id: &str,
        _chat_id: &str,
        _message: &Message,
    ) -> Result<(), StorageError> {
        self.message_writes.fetch_add(1, Ordering::SeqCst);
        Err(refused())
    }

    async fn load_projects(&self, _user_id: &str) -> Result<Vec<Project>, StorageError> {
        Ok(Vec::new())
    }

    async fn upsert_project(&self, _user_id: &str, _project: &Project) -> Result<(), StorageError> {
        Ok(())
    }

    async fn delete_project(&self, _project_id: &str) -> Result<(), StorageError> {
        Ok(())
    }

    async fn subscribe_messages(
        &self,
        _user_id: &str,
    ) -> Result<BoxStream<'static, RemoteMessage>, StorageError> {
        Ok(stream::pending().boxed())
    }
}

async fn wait_for_messages(workspace: &Workspace, chat_id: &str, count: usize) {
    for _ in 0..500 {
        if workspace.chat(chat_id).is_some_and(|c| c.messages.len() >= count) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("pushed message did not arrive");
}

// =============================================================================
// Fallback to local-only storage
// =============================================================================

#[tokio::test]
async fn test_failed_write_switches_to_offline() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let store = Arc::new(RefusingStore::default());
    let remote: Arc<dyn HistoryStore> = Arc::<RefusingStore>::clone(&store);
    let persistence = persistence(&dir, Some(remote), None, &workspace).await;

    persistence.activate(&settings_for("alice")).await;
    assert_eq!(persistence.mode(), StorageMode::Online);

    let (chat_id, _) = workspace.create_chat_if_needed("Привет");
    let message = Message::user("Привет", Vec::new());
    let message_id = message.id.clone();
    workspace.add_message(&chat_id, message);
    persistence
        .persist(Change::MessageAppended {
            chat_id: chat_id.clone(),
            message_id: message_id.clone(),
        })
        .await;

    assert_eq!(persistence.mode(), StorageMode::Offline);
    assert_eq!(store.message_writes.load(Ordering::SeqCst), 1);

    // Offline: history still reaches disk, the hosted store is left alone.
    persistence
        .persist(Change::MessageAppended {
            chat_id: chat_id.clone(),
            message_id,
        })
        .await;
    assert_eq!(store.message_writes.load(Ordering::SeqCst), 1);
    let stored = std::fs::read_to_string(dir.path().join("prisma_chats.json")).unwrap();
    assert!(stored.contains("Привет"));
}

#[tokio::test]
async fn test_failed_activation_keeps_local_history() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let (chat_id, _) = workspace.create_chat_if_needed("Локально");
    let store = RefusingStore {
        fail_loads: true,
        ..RefusingStore::default()
    };
    let remote: Arc<dyn HistoryStore> = Arc::new(store);
    let persistence = persistence(&dir, Some(remote), None, &workspace).await;

    persistence.activate(&settings_for("alice")).await;

    assert_eq!(persistence.mode(), StorageMode::Offline);
    assert!(workspace.chat(&chat_id).is_some());
    assert!(persistence.subscribe().await.is_none());
}

// =============================================================================
// Connecting on activation
// =============================================================================

#[tokio::test]
async fn test_activation_dials_configured_store() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let persistence = persistence(&dir, None, Some(memory_config()), &workspace).await;
    assert!(persistence.hosted_configured());

    persistence.activate(&settings_for("")).await;
    assert_eq!(persistence.mode(), StorageMode::Local);

    persistence.activate(&settings_for("alice")).await;
    assert_eq!(persistence.mode(), StorageMode::Online);
}

#[tokio::test]
async fn test_unreachable_store_is_offline_only_with_user() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let config = HostedConfig {
        url: format!("ws://127.0.0.1:{port}"),
        ..memory_config()
    };
    let persistence = persistence(&dir, None, Some(config), &workspace).await;

    persistence.activate(&settings_for("")).await;
    assert_eq!(persistence.mode(), StorageMode::Local);

    persistence.activate(&settings_for("alice")).await;
    assert_eq!(persistence.mode(), StorageMode::Offline);

    // Saving settings dials again rather than reusing the failed attempt.
    persistence.activate(&settings_for("alice")).await;
    assert_eq!(persistence.mode(), StorageMode::Offline);
}

// =============================================================================
// Activation merge
// =============================================================================

#[tokio::test]
async fn test_activation_uploads_local_only_history() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let project = workspace.create_project("Работа").unwrap();
    let (chat_id, _) = workspace.create_chat_if_needed("Локальный чат");
    let message = Message::user("Привет", Vec::new());
    let message_id = message.id.clone();
    workspace.add_message(&chat_id, message);
    assert!(workspace.assign_chat(&chat_id, Some(project.id.as_str())));

    let store = HostedStore::connect(&memory_config()).await.unwrap();
    let remote: Arc<dyn HistoryStore> = Arc::new(store.clone());
    let persistence = persistence(&dir, Some(remote), None, &workspace).await;

    persistence.activate(&settings_for("alice")).await;
    assert_eq!(persistence.mode(), StorageMode::Online);

    let chats = store.load_chats("alice").await.unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].id, chat_id);
    assert_eq!(chats[0].title, "Локальный чат");
    assert_eq!(chats[0].project_id.as_deref(), Some(project.id.as_str()));
    assert_eq!(chats[0].messages.len(), 1);
    assert_eq!(chats[0].messages[0].id, message_id);

    let projects = store.load_projects("alice").await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Работа");

    // A second activation has nothing left to upload.
    persistence.activate(&settings_for("alice")).await;
    assert_eq!(store.load_chats("alice").await.unwrap()[0].messages.len(), 1);
}

// =============================================================================
// Realtime pushes
// =============================================================================

#[tokio::test]
async fn test_pushed_messages_reach_workspace_once() {
    let dir = TempDir::new().unwrap();
    let workspace = Workspace::new();
    let (chat_id, _) = workspace.create_chat_if_needed("Общий чат");

    let store = HostedStore::connect(&memory_config()).await.unwrap();
    let remote: Arc<dyn HistoryStore> = Arc::new(store.clone());
    let persistence = persistence(&dir, Some(remote), None, &workspace).await;
    persistence.activate(&settings_for("alice")).await;

    let events = EventBus::new(64);
    let sync = RealtimeSync::new(Arc::clone(&persistence), workspace.clone(), events);
    assert!(sync.restart().await);
    assert!(sync.is_running());

    // Written by another device.
    let pushed = Message::assistant("С другого устройства");
    store.insert_message("alice", &chat_id, &pushed).await.unwrap();
    wait_for_messages(&workspace, &chat_id, 1).await;
    assert_eq!(workspace.chat(&chat_id).unwrap().messages[0].id, pushed.id);

    // Our own append echoes back through the feed and is not duplicated.
    let own = Message::user("Моё сообщение", Vec::new());
    let own_id = own.id.clone();
    workspace.add_message(&chat_id, own);
    persistence
        .persist(Change::MessageAppended {
            chat_id: chat_id.clone(),
            message_id: own_id.clone(),
        })
        .await;

    // Another device's message after the echo proves the echo was processed.
    let later = Message::assistant("Ещё одно");
    store.insert_message("alice", &chat_id, &later).await.unwrap();
    wait_for_messages(&workspace, &chat_id, 3).await;

    let messages = workspace.chat(&chat_id).unwrap().messages;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages.iter().filter(|m| m.id == own_id).count(), 1);

    // Other users' messages are not delivered.
    store
        .insert_message("bob", &chat_id, &Message::assistant("Чужое"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(workspace.chat(&chat_id).unwrap().messages.len(), 3);
}
