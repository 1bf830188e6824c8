//! Hosted history in SurrealDB.
//!
//! Tables: `users`, `chats`, `projects`, `messages`. Records are keyed by the
//! workspace ids and carry the owning `user_id`, so one database can hold the
//! history of many users.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::{Any, connect};
use surrealdb::opt::auth::Root;
use surrealdb::{Action, Notification, Surreal};

use super::{HistoryStore, RemoteMessage, StorageError, UserProfile};
use crate::config::HostedConfig;
use crate::domain::{Attachment, Chat, Message, Project, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    user_id: String,
    display_name: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatRecord {
    chat_id: String,
    user_id: String,
    title: String,
    date: DateTime<Utc>,
    #[serde(default)]
    project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageRecord {
    message_id: String,
    chat_id: String,
    user_id: String,
    role: Role,
    content: String,
    timestamp: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    attachments: Vec<Attachment>,
}

impl MessageRecord {
    fn new(user_id: &str, chat_id: &str, message: &Message) -> Self {
        Self {
            message_id: message.id.clone(),
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp.clone(),
            created_at: message.created_at,
            attachments: message.attachments.clone(),
        }
    }

    fn into_message(self) -> (String, Message) {
        let message = Message::restore(
            self.message_id,
            self.role,
            self.content,
            self.timestamp,
            self.created_at,
            self.attachments,
        );
        (self.chat_id, message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectRecord {
    project_id: String,
    user_id: String,
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HostedStore {
    db: Surreal<Any>,
}

impl HostedStore {
    /// Connect to the configured endpoint (`ws://`, `wss://` or `mem://`).
    pub async fn connect(config: &HostedConfig) -> Result<Self, StorageError> {
        let db = connect(config.url.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        tracing::info!(
            name: "storage.hosted.connected",
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connected to hosted store"
        );
        Ok(Self { db })
    }

    async fn messages_for(&self, user_id: &str) -> Result<Vec<MessageRecord>, StorageError> {
        let mut response = self
            .db
            .query("SELECT * FROM messages WHERE user_id = $user")
            .bind(("user", user_id.to_string()))
            .await?;
        let records: Vec<MessageRecord> = response.take(0)?;
        Ok(records)
    }
}

#[async_trait]
impl HistoryStore for HostedStore {
    async fn upsert_user(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let record = UserRecord {
            user_id: profile.user_id.clone(),
            display_name: profile.display_name.clone(),
            updated_at: Utc::now(),
        };
        let _: Option<UserRecord> = self
            .db
            .upsert(("users", profile.user_id.as_str()))
            .content(record)
            .await?;
        Ok(())
    }

    async fn load_chats(&self, user_id: &str) -> Result<Vec<Chat>, StorageError> {
        let mut response = self
            .db
            .query("SELECT * FROM chats WHERE user_id = $user")
            .bind(("user", user_id.to_string()))
            .await?;
        let records: Vec<ChatRecord> = response.take(0)?;

        let mut by_chat: HashMap<String, Vec<Message>> = HashMap::new();
        for record in self.messages_for(user_id).await? {
            let (chat_id, message) = record.into_message();
            by_chat.entry(chat_id).or_default().push(message);
        }

        let mut chats: Vec<Chat> = records
            .into_iter()
            .map(|record| {
                let mut messages = by_chat.remove(&record.chat_id).unwrap_or_default();
                messages.sort_by_key(|m| m.created_at);
                Chat {
                    id: record.chat_id,
                    title: record.title,
                    date: record.date,
                    messages,
                    project_id: record.project_id,
                }
            })
            .collect();
        chats.sort_by(|a, b| b.date.cmp(&a.date));

        tracing::debug!(user = %user_id, chats = chats.len(), "Loaded hosted chats");
        Ok(chats)
    }

    async fn upsert_chat(&self, user_id: &str, chat: &Chat) -> Result<(), StorageError> {
        let record = ChatRecord {
            chat_id: chat.id.clone(),
            user_id: user_id.to_string(),
            title: chat.title.clone(),
            date: chat.date,
            project_id: chat.project_id.clone(),
        };
        let _: Option<ChatRecord> = self
            .db
            .upsert(("chats", chat.id.as_str()))
            .content(record)
            .await?;
        Ok(())
    }

    async fn delete_chat(&self, chat_id: &str) -> Result<(), StorageError> {
        self.db
            .query("DELETE messages WHERE chat_id = $chat")
            .query("DELETE chats WHERE chat_id = $chat")
            .bind(("chat", chat_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    async fn insert_message(
        &self,
        user_id: &str,
        chat_id: &str,
        message: &Message,
    ) -> Result<(), StorageError> {
        let _: Option<MessageRecord> = self
            .db
            .create(("messages", message.id.as_str()))
            .content(MessageRecord::new(user_id, chat_id, message))
            .await?;
        Ok(())
    }

    async fn load_projects(&self, user_id: &str) -> Result<Vec<Project>, StorageError> {
        let mut response = self
            .db
            .query("SELECT * FROM projects WHERE user_id = $user")
            .bind(("user", user_id.to_string()))
            .await?;
        let records: Vec<ProjectRecord> = response.take(0)?;

        let mut projects: Vec<Project> = records
            .into_iter()
            .map(|r| Project {
                id: r.project_id,
                name: r.name,
                created_at: r.created_at,
            })
            .collect();
        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }

    async fn upsert_project(&self, user_id: &str, project: &Project) -> Result<(), StorageError> {
        let record = ProjectRecord {
            project_id: project.id.clone(),
            user_id: user_id.to_string(),
            name: project.name.clone(),
            created_at: project.created_at,
        };
        let _: Option<ProjectRecord> = self
            .db
            .upsert(("projects", project.id.as_str()))
            .content(record)
            .await?;
        Ok(())
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), StorageError> {
        self.db
            .query("UPDATE chats SET project_id = NONE WHERE project_id = $project")
            .query("DELETE projects WHERE project_id = $project")
            .bind(("project", project_id.to_string()))
            .await?
            .check()?;
        Ok(())
    }

    async fn subscribe_messages(
        &self,
        user_id: &str,
    ) -> Result<BoxStream<'static, RemoteMessage>, StorageError> {
        let live = self.db.select::<Vec<MessageRecord>>("messages").live().await?;
        let user = user_id.to_string();
        tracing::info!(name: "storage.hosted.subscribed", user = %user, "Subscribed to hosted messages");

        let stream = async_stream::stream! {
            futures::pin_mut!(live);
            while let Some(item) = live.next().await {
                let notification: Notification<MessageRecord> = match item {
                    Ok(notification) => notification,
                    Err(e) => {
                        tracing::warn!(error = %e, "Hosted message feed error");
                        continue;
                    }
                };
                if !matches!(notification.action, Action::Create) || notification.data.user_id != user {
                    continue;
                }
                let (chat_id, message) = notification.data.into_message();
                yield RemoteMessage { chat_id, message };
            }
            tracing::info!("Hosted message feed closed");
        };
        Ok(stream.boxed())
    }
}
