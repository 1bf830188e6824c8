//! The shared workspace: chats, projects and the input bar's transient state.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::domain::{
    Attachment, Chat, DEFAULT_MODEL_ID, Message, ModelOption, Project, UploadStatus, find_model,
    title_from,
};

/// How long an upload notice stays visible.
pub const NOTICE_TTL: Duration = Duration::from_secs(4);

/// Local chat (or messages) the hosted store has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub chat_id: String,
    pub message_ids: Vec<String>,
}

#[derive(Debug)]
struct UploadNotice {
    text: String,
    raised_at: Instant,
}

#[derive(Debug)]
struct WorkspaceState {
    /// Newest first.
    chats: Vec<Chat>,
    projects: Vec<Project>,
    current_chat_id: Option<String>,
    selected_model_id: String,
    drafts: Vec<Attachment>,
    notice: Option<UploadNotice>,
    loading: bool,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self {
            chats: Vec::new(),
            projects: Vec::new(),
            current_chat_id: None,
            selected_model_id: DEFAULT_MODEL_ID.to_string(),
            drafts: Vec::new(),
            notice: None,
            loading: false,
        }
    }
}

impl WorkspaceState {
    fn chat_mut(&mut self, id: &str) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == id)
    }

    fn sort_chats(&mut self) {
        self.chats.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

/// Thread-safe handle to the workspace. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    inner: Arc<RwLock<WorkspaceState>>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all history, e.g. after loading the local snapshot.
    pub fn replace_history(&self, mut chats: Vec<Chat>, projects: Vec<Project>) {
        for chat in &mut chats {
            chat.messages.iter_mut().for_each(Message::normalize);
        }
        let mut state = self.inner.write().unwrap();
        state.chats = chats;
        state.projects = projects;
        state.sort_chats();
        if let Some(current) = state.current_chat_id.clone()
            && !state.chats.iter().any(|c| c.id == current)
        {
            state.current_chat_id = None;
        }
    }

    /// Merge history loaded from the hosted store.
    ///
    /// Returns the chats that have local content the hosted store is missing.
    pub fn merge_history(&self, remote_chats: Vec<Chat>, remote_projects: Vec<Project>) -> Vec<PendingUpload> {
        let mut state = self.inner.write().unwrap();

        for project in remote_projects {
            match state.projects.iter_mut().find(|p| p.id == project.id) {
                Some(existing) => existing.name = project.name,
                None => state.projects.push(project),
            }
        }
        state.projects.sort_by_key(|p| p.created_at);

        let remote_ids: HashSet<String> = remote_chats.iter().map(|c| c.id.clone()).collect();
        let mut pending = Vec::new();

        for remote in remote_chats {
            let Some(local) = state.chat_mut(&remote.id) else {
                state.chats.push(remote);
                continue;
            };

            let remote_message_ids: HashSet<&str> =
                remote.messages.iter().map(|m| m.id.as_str()).collect();
            let local_only: Vec<String> = local
                .messages
                .iter()
                .filter(|m| !remote_message_ids.contains(m.id.as_str()))
                .map(|m| m.id.clone())
                .collect();

            for message in remote.messages {
                if !local.has_message(&message.id) {
                    local.messages.push(message);
                }
            }
            local.messages.sort_by_key(|m| m.created_at);
            local.title = remote.title;
            local.project_id = remote.project_id;
            local.date = local.date.max(remote.date);

            if !local_only.is_empty() {
                pending.push(PendingUpload {
                    chat_id: local.id.clone(),
                    message_ids: local_only,
                });
            }
        }

        for chat in state.chats.iter().filter(|c| !remote_ids.contains(&c.id)) {
            pending.push(PendingUpload {
                chat_id: chat.id.clone(),
                message_ids: chat.messages.iter().map(|m| m.id.clone()).collect(),
            });
        }

        let known: HashSet<String> = state.projects.iter().map(|p| p.id.clone()).collect();
        for chat in &mut state.chats {
            if chat.project_id.as_ref().is_some_and(|p| !known.contains(p)) {
                chat.project_id = None;
            }
        }
        state.sort_chats();
        pending
    }

    // --- Chats ---

    #[must_use]
    pub fn chats(&self) -> Vec<Chat> {
        self.inner.read().unwrap().chats.clone()
    }

    #[must_use]
    pub fn chat(&self, id: &str) -> Option<Chat> {
        self.inner
            .read()
            .unwrap()
            .chats
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    #[must_use]
    pub fn current_chat_id(&self) -> Option<String> {
        self.inner.read().unwrap().current_chat_id.clone()
    }

    #[must_use]
    pub fn current_chat(&self) -> Option<Chat> {
        let state = self.inner.read().unwrap();
        let id = state.current_chat_id.as_deref()?;
        state.chats.iter().find(|c| c.id == id).cloned()
    }

    /// Leave the current chat and reset the input bar.
    pub fn new_chat(&self) {
        let mut state = self.inner.write().unwrap();
        state.current_chat_id = None;
        state.drafts.clear();
        state.notice = None;
    }

    /// Make `id` the current chat. Unknown ids are ignored.
    pub fn select_chat(&self, id: &str) -> bool {
        let mut state = self.inner.write().unwrap();
        if !state.chats.iter().any(|c| c.id == id) {
            return false;
        }
        state.current_chat_id = Some(id.to_string());
        true
    }

    pub fn rename_chat(&self, id: &str, title: &str) -> bool {
        let title = title.trim();
        if title.is_empty() {
            return false;
        }
        let mut state = self.inner.write().unwrap();
        match state.chat_mut(id) {
            Some(chat) => {
                chat.title = title.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete_chat(&self, id: &str) -> bool {
        let mut state = self.inner.write().unwrap();
        let before = state.chats.len();
        state.chats.retain(|c| c.id != id);
        if state.chats.len() == before {
            return false;
        }
        if state.current_chat_id.as_deref() == Some(id) {
            state.current_chat_id = None;
        }
        true
    }

    /// Current chat id, creating (and selecting) a new chat when there is none.
    ///
    /// The flag is `true` when a chat was created.
    pub fn create_chat_if_needed(&self, title_source: &str) -> (String, bool) {
        let mut state = self.inner.write().unwrap();
        if let Some(id) = state.current_chat_id.clone() {
            return (id, false);
        }
        let chat = Chat::new(title_from(title_source));
        let id = chat.id.clone();
        state.chats.insert(0, chat);
        state.current_chat_id = Some(id.clone());
        (id, true)
    }

    /// Append a message and bump the chat's activity date.
    pub fn add_message(&self, chat_id: &str, message: Message) -> bool {
        let mut state = self.inner.write().unwrap();
        let Some(chat) = state.chat_mut(chat_id) else {
            return false;
        };
        chat.messages.push(message);
        chat.date = Utc::now();
        state.sort_chats();
        true
    }

    /// Append a message pushed by the hosted store unless it is already here.
    pub fn apply_remote_message(&self, chat_id: &str, message: Message) -> bool {
        let mut state = self.inner.write().unwrap();
        let Some(chat) = state.chat_mut(chat_id) else {
            return false;
        };
        if chat.has_message(&message.id) {
            return false;
        }
        chat.date = chat.date.max(message.created_at);
        chat.messages.push(message);
        state.sort_chats();
        true
    }

    // --- Projects ---

    #[must_use]
    pub fn projects(&self) -> Vec<Project> {
        self.inner.read().unwrap().projects.clone()
    }

    pub fn create_project(&self, name: &str) -> Option<Project> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let project = Project::new(name);
        self.inner.write().unwrap().projects.push(project.clone());
        Some(project)
    }

    pub fn rename_project(&self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let mut state = self.inner.write().unwrap();
        match state.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                project.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a project; its chats stay, detached.
    pub fn delete_project(&self, id: &str) -> bool {
        let mut state = self.inner.write().unwrap();
        let before = state.projects.len();
        state.projects.retain(|p| p.id != id);
        if state.projects.len() == before {
            return false;
        }
        for chat in &mut state.chats {
            if chat.project_id.as_deref() == Some(id) {
                chat.project_id = None;
            }
        }
        true
    }

    /// Move a chat into a project, or out of any project with `None`.
    pub fn assign_chat(&self, chat_id: &str, project_id: Option<&str>) -> bool {
        let mut state = self.inner.write().unwrap();
        if let Some(project_id) = project_id
            && !state.projects.iter().any(|p| p.id == project_id)
        {
            return false;
        }
        match state.chat_mut(chat_id) {
            Some(chat) => {
                chat.project_id = project_id.map(str::to_string);
                true
            }
            None => false,
        }
    }

    // --- Model ---

    /// Select a catalog model. Unknown ids are refused.
    pub fn select_model(&self, id: &str) -> bool {
        if find_model(id).id != id {
            return false;
        }
        self.inner.write().unwrap().selected_model_id = id.to_string();
        true
    }

    #[must_use]
    pub fn selected_model(&self) -> &'static ModelOption {
        find_model(&self.inner.read().unwrap().selected_model_id)
    }

    // --- Drafts ---

    #[must_use]
    pub fn drafts(&self) -> Vec<Attachment> {
        self.inner.read().unwrap().drafts.clone()
    }

    pub fn add_drafts(&self, attachments: Vec<Attachment>) {
        self.inner.write().unwrap().drafts.extend(attachments);
    }

    /// Remove one draft. Refused while an upload is running.
    pub fn remove_draft(&self, index: usize) -> bool {
        let mut state = self.inner.write().unwrap();
        if index >= state.drafts.len() || state.drafts.iter().any(is_uploading) {
            return false;
        }
        state.drafts.remove(index);
        true
    }

    pub fn mark_drafts_uploading(&self) {
        let mut state = self.inner.write().unwrap();
        for draft in &mut state.drafts {
            draft.upload_status = UploadStatus::Uploading;
            draft.upload_progress = 0.0;
        }
    }

    pub fn set_draft_progress(&self, percent: f32) {
        let percent = percent.clamp(0.0, 100.0);
        let mut state = self.inner.write().unwrap();
        for draft in state.drafts.iter_mut().filter(|d| is_uploading(d)) {
            draft.upload_progress = percent;
        }
    }

    pub fn mark_drafts_failed(&self) {
        let mut state = self.inner.write().unwrap();
        for draft in &mut state.drafts {
            draft.upload_status = UploadStatus::Error;
        }
    }

    pub fn clear_drafts(&self) {
        self.inner.write().unwrap().drafts.clear();
    }

    #[must_use]
    pub fn is_uploading(&self) -> bool {
        self.inner.read().unwrap().drafts.iter().any(is_uploading)
    }

    // --- Upload notice ---

    pub fn raise_notice(&self, text: impl Into<String>) {
        self.inner.write().unwrap().notice = Some(UploadNotice {
            text: text.into(),
            raised_at: Instant::now(),
        });
    }

    pub fn clear_notice(&self) {
        self.inner.write().unwrap().notice = None;
    }

    /// The notice text, if raised less than [`NOTICE_TTL`] ago.
    #[must_use]
    pub fn upload_notice(&self) -> Option<String> {
        self.notice_at(Instant::now())
    }

    fn notice_at(&self, now: Instant) -> Option<String> {
        let state = self.inner.read().unwrap();
        let notice = state.notice.as_ref()?;
        (now.saturating_duration_since(notice.raised_at) < NOTICE_TTL).then(|| notice.text.clone())
    }

    // --- Loading ---

    /// Mark a request as in flight. Fails if one already is.
    pub fn begin_request(&self) -> bool {
        let mut state = self.inner.write().unwrap();
        if state.loading {
            return false;
        }
        state.loading = true;
        true
    }

    pub fn finish_request(&self) {
        self.inner.write().unwrap().loading = false;
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.read().unwrap().loading
    }
}

fn is_uploading(draft: &Attachment) -> bool {
    draft.upload_status == UploadStatus::Uploading
}
