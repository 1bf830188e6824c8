//! Persistence strategies.
//!
//! History always lands in the local store. When a hosted store is
//! configured and reachable, changes are mirrored there as well and new
//! messages pushed by the hosted store are merged back in.
//!
//! # Structure
//!
//! - [`local`]: file-backed key-value documents
//! - [`settings`]: settings document with the password encrypted at rest
//! - [`hosted`]: SurrealDB tables with a live query for new messages
//! - [`Persistence`]: the facade that switches between online and local-only mode

pub mod hosted;
pub mod local;
pub mod settings;

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::Serialize;

use crate::config::HostedConfig;
use crate::domain::{Chat, Message, Project, Settings};
use crate::events::{EventBus, WorkspaceEvent};
use crate::workspace::Workspace;

pub use hosted::HostedStore;
pub use local::LocalStore;
pub use settings::SettingsStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hosted store error: {0}")]
    Hosted(#[from] surrealdb::Error),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Hosted store is not configured")]
    NotConfigured,

    #[error("Hosted store did not answer within {0:?}")]
    ConnectTimeout(Duration),
}

/// How long activation waits for the hosted store to accept a connection.
pub const HOSTED_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Profile row kept in the hosted `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: String,
    pub display_name: String,
}

impl UserProfile {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        settings.hosted_user().map(|user_id| Self {
            user_id: user_id.to_string(),
            display_name: settings.display_name.trim().to_string(),
        })
    }
}

/// A message pushed by the hosted store's realtime feed.
#[derive(Debug, Clone)]
pub struct RemoteMessage {
    pub chat_id: String,
    pub message: Message,
}

/// Hosted history backend.
#[async_trait]
pub trait HistoryStore: Send + Sync + std::fmt::Debug {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StorageError>;

    /// All chats of a user, newest first, with their messages in order.
    async fn load_chats(&self, user_id: &str) -> Result<Vec<Chat>, StorageError>;
    async fn upsert_chat(&self, user_id: &str, chat: &Chat) -> Result<(), StorageError>;
    async fn delete_chat(&self, chat_id: &str) -> Result<(), StorageError>;

    async fn insert_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: &Message,
    ) -> Result<(), StorageError>;

    async fn load_projects(&self, user_id: &str) -> Result<Vec<Project>, StorageError>;
    async fn upsert_project(&self, user_id: &str, project: &Project) -> Result<(), StorageError>;
    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError>;

    /// Realtime feed of messages inserted for the user's chats.
    async fn subscribe_messages(
        &self,
        user_id: &str,
    ) -> Result<BoxStream<'static, RemoteMessage>, StorageError>;
}

/// Where history is currently being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// No hosted store configured, or no user to store history for.
    Local,
    /// Mirrored to the hosted store.
    Online,
    /// Hosted store configured but unavailable; local only.
    Offline,
}

impl StorageMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

/// A workspace change to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    ChatUpserted(String),
    MessageAppended { chat_id: String, message_id: String },
    ChatRemoved(String),
    ProjectUpserted(String),
    ProjectRemoved(String),
    /// Only the local snapshot needs rewriting (e.g. after a remote push).
    LocalOnly,
}

/// Writes workspace changes locally and, when online, to the hosted store.
///
/// The hosted connection is opened lazily on activation and dropped when
/// activation fails, so the next activation dials again.
#[derive(Debug)]
pub struct Persistence {
    local: LocalStore,
    remote: RwLock<Option<Arc<dyn HistoryStore>>>,
    hosted: Option<HostedConfig>,
    mode: RwLock<StorageMode>,
    user: RwLock<Option<String>>,
    workspace: Workspace,
    events: EventBus,
    write_lock: tokio::sync::Mutex<()>,
}

impl Persistence {
    /// `hosted` is dialed on activation when no `remote` is connected yet.
    #[must_use]
    pub fn new(
        local: LocalStore,
        remote: Option<Arc<dyn HistoryStore>>,
        hosted: Option<HostedConfig>,
        workspace: Workspace,
        events: EventBus,
    ) -> Self {
        Self {
            local,
            remote: RwLock::new(remote),
            hosted,
            mode: RwLock::new(StorageMode::Local),
            user: RwLock::new(None),
            workspace,
            events,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn mode(&self) -> StorageMode {
        *self.mode.read().unwrap()
    }

    #[must_use]
    pub fn hosted_configured(&self) -> bool {
        self.hosted.is_some() || self.remote.read().unwrap().is_some()
    }

    fn set_mode(&self, mode: StorageMode) {
        let previous = std::mem::replace(&mut *self.mode.write().unwrap(), mode);
        if previous != mode {
            tracing::info!(name: "storage.mode.changed", from = previous.as_str(), to = mode.as_str(), "Storage mode changed");
            self.events.emit(WorkspaceEvent::StorageMode { mode });
        }
    }

    fn go_offline(&self, error: &StorageError) {
        tracing::warn!(name: "storage.mode.offline", error = %error, "Hosted store failed, continuing with local storage only");
        self.set_mode(StorageMode::Offline);
    }

    /// Hosted store and user to mirror to, when online.
    fn online_target(&self) -> Option<(Arc<dyn HistoryStore>, String)> {
        if self.mode() != StorageMode::Online {
            return None;
        }
        let remote = self.remote.read().unwrap().clone()?;
        let user = self.user.read().unwrap().clone()?;
        Some((remote, user))
    }

    /// The connected hosted store, dialing it first if needed.
    async fn connect(&self) -> Result<Arc<dyn HistoryStore>, StorageError> {
        let existing = self.remote.read().unwrap().clone();
        if let Some(remote) = existing {
            return Ok(remote);
        }
        let config = self.hosted.as_ref().ok_or(StorageError::NotConfigured)?;
        let store = tokio::time::timeout(HOSTED_CONNECT_TIMEOUT, HostedStore::connect(config))
            .await
            .map_err(|_elapsed| StorageError::ConnectTimeout(HOSTED_CONNECT_TIMEOUT))??;
        let remote: Arc<dyn HistoryStore> = Arc::new(store);
        *self.remote.write().unwrap() = Some(Arc::clone(&remote));
        Ok(remote)
    }

    /// Load local history into the workspace, then try to go online.
    pub async fn restore(&self, settings: &Settings) {
        match self.read_local_history().await {
            Ok((chats, projects)) => {
                tracing::info!(chats = chats.len(), projects = projects.len(), "Restored local history");
                self.workspace.replace_history(chats, projects);
            }
            Err(e) => tracing::error!(error = %e, "Failed to parse chats"),
        }
        self.activate(settings).await;
    }

    async fn read_local_history(&self) -> Result<(Vec<Chat>, Vec<Project>), StorageError> {
        let chats = self
            .local
            .get_json::<Vec<Chat>>(local::CHATS_KEY)
            .await?
            .unwrap_or_default();
        let projects = self
            .local
            .get_json::<Vec<Project>>(local::PROJECTS_KEY)
            .await?
            .unwrap_or_default();
        Ok((chats, projects))
    }

    /// Connect history to the hosted store for the user named in `settings`.
    ///
    /// Remote history is merged into the workspace and anything that only
    /// exists locally is uploaded. Called at startup and whenever settings
    /// are saved, which also gives an offline session a way back online.
    pub async fn activate(&self, settings: &Settings) {
        if !self.hosted_configured() {
            return;
        }
        let Some(profile) = UserProfile::from_settings(settings) else {
            tracing::info!("No external user id configured, hosted history disabled");
            *self.user.write().unwrap() = None;
            self.set_mode(StorageMode::Local);
            return;
        };

        let _guard = self.write_lock.lock().await;
        let result = match self.connect().await {
            Ok(remote) => self.sync_with(remote.as_ref(), &profile).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(uploaded) => {
                *self.user.write().unwrap() = Some(profile.user_id.clone());
                self.set_mode(StorageMode::Online);
                tracing::info!(name: "storage.mode.online", user = %profile.user_id, uploaded_chats = uploaded, "Hosted history connected");
                self.events.emit(WorkspaceEvent::ChatsChanged);
            }
            Err(e) => {
                if self.hosted.is_some() {
                    *self.remote.write().unwrap() = None;
                }
                self.go_offline(&e);
            }
        }
        self.write_snapshot().await;
    }

    async fn sync_with(
        &self,
        remote: &dyn HistoryStore,
        profile: &UserProfile,
    ) -> Result<usize, StorageError> {
        remote.upsert_user(profile).await?;
        let chats = remote.load_chats(&profile.user_id).await?;
        let projects = remote.load_projects(&profile.user_id).await?;

        let remote_projects: HashSet<String> = projects.iter().map(|p| p.id.clone()).collect();
        let pending = self.workspace.merge_history(chats, projects);

        for project in self.workspace.projects() {
            if !remote_projects.contains(&project.id) {
                remote.upsert_project(&profile.user_id, &project).await?;
            }
        }

        let uploaded = pending.len();
        for upload in pending {
            let Some(chat) = self.workspace.chat(&upload.chat_id) else {
                continue;
            };
            remote.upsert_chat(&profile.user_id, &chat).await?;
            for message in chat
                .messages
                .iter()
                .filter(|m| upload.message_ids.contains(&m.id))
            {
                remote
                    .insert_message(&profile.user_id, &chat.id, message)
                    .await?;
            }
        }
        Ok(uploaded)
    }

    /// Register the user profile with the hosted store.
    pub async fn register_user(&self, settings: &Settings) {
        let Some((remote, _)) = self.online_target() else {
            return;
        };
        let Some(profile) = UserProfile::from_settings(settings) else {
            return;
        };
        if let Err(e) = remote.upsert_user(&profile).await {
            self.go_offline(&e);
        }
    }

    /// Persist a workspace change.
    pub async fn persist(&self, change: Change) {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot().await;

        if change == Change::LocalOnly {
            return;
        }
        let Some((remote, user)) = self.online_target() else {
            return;
        };
        if let Err(e) = self.mirror(remote.as_ref(), &user, &change).await {
            self.go_offline(&e);
        }
    }

    async fn mirror(
        &self,
        remote: &dyn HistoryStore,
        user: &str,
        change: &Change,
    ) -> Result<(), StorageError> {
        match change {
            Change::ChatUpserted(chat_id) => {
                if let Some(chat) = self.workspace.chat(chat_id) {
                    remote.upsert_chat(user, &chat).await?;
                }
            }
            Change::MessageAppended {
                chat_id,
                message_id,
            } => {
                if let Some(chat) = self.workspace.chat(chat_id) {
                    remote.upsert_chat(user, &chat).await?;
                    if let Some(message) = chat.messages.iter().find(|m| &m.id == message_id) {
                        remote.insert_message(user, chat_id, message).await?;
                    }
                }
            }
            Change::ChatRemoved(chat_id) => remote.delete_chat(chat_id).await?,
            Change::ProjectUpserted(project_id) => {
                if let Some(project) = self
                    .workspace
                    .projects()
                    .into_iter()
                    .find(|p| &p.id == project_id)
                {
                    remote.upsert_project(user, &project).await?;
                }
            }
            Change::ProjectRemoved(project_id) => remote.delete_project(project_id).await?,
            Change::LocalOnly => {}
        }
        tracing::debug!(change = ?change, "Mirrored change to hosted store");
        Ok(())
    }

    async fn write_snapshot(&self) {
        let chats = self.workspace.chats();
        let projects = self.workspace.projects();
        if let Err(e) = self.local.set_json(local::CHATS_KEY, &chats).await {
            tracing::error!(error = %e, "Failed to write chats to local storage");
        }
        if let Err(e) = self.local.set_json(local::PROJECTS_KEY, &projects).await {
            tracing::error!(error = %e, "Failed to write projects to local storage");
        }
    }

    /// Subscribe to the hosted realtime feed, if online.
    pub async fn subscribe(&self) -> Option<BoxStream<'static, RemoteMessage>> {
        let (remote, user) = self.online_target()?;
        match remote.subscribe_messages(&user).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                self.go_offline(&e);
                None
            }
        }
    }
}
