//! Sidebar view model: search, project folders and recency groups.

use chrono::{DateTime, Duration, Local, NaiveTime, TimeZone, Utc};

use crate::domain::{Chat, Project};

/// Recency bucket for chats outside any project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recency {
    Today,
    Yesterday,
    LastWeek,
    LastMonth,
    Earlier,
}

impl Recency {
    pub const ALL: [Recency; 5] = [
        Self::Today,
        Self::Yesterday,
        Self::LastWeek,
        Self::LastMonth,
        Self::Earlier,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Сегодня",
            Self::Yesterday => "Вчера",
            Self::LastWeek => "За 7 дней",
            Self::LastMonth => "За месяц",
            Self::Earlier => "Ранее",
        }
    }

    /// Bucket for `date`, measured from local midnight of `now`.
    #[must_use]
    pub fn of(date: DateTime<Utc>, now: DateTime<Local>) -> Self {
        let midnight = now.date_naive().and_time(NaiveTime::MIN);
        let today = Local
            .from_local_datetime(&midnight)
            .earliest()
            .map_or_else(|| now.with_timezone(&Utc), |t| t.with_timezone(&Utc));

        if date >= today {
            Self::Today
        } else if date >= today - Duration::days(1) {
            Self::Yesterday
        } else if date >= today - Duration::days(7) {
            Self::LastWeek
        } else if date >= today - Duration::days(30) {
            Self::LastMonth
        } else {
            Self::Earlier
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub project_id: Option<String>,
}

impl From<&Chat> for ChatSummary {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id.clone(),
            title: chat.title.clone(),
            project_id: chat.project_id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectFolder {
    pub project: Project,
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone)]
pub struct SidebarView {
    pub query: String,
    pub folders: Vec<ProjectFolder>,
    /// Non-empty groups only, in [`Recency::ALL`] order.
    pub groups: Vec<(Recency, Vec<ChatSummary>)>,
    /// Every project, for the "move to project" menus.
    pub projects: Vec<Project>,
}

impl SidebarView {
    /// A search is active and matched nothing.
    #[must_use]
    pub fn nothing_found(&self) -> bool {
        !self.query.trim().is_empty()
            && self.groups.is_empty()
            && self.folders.iter().all(|f| f.chats.is_empty())
    }
}

/// Chats matching `query` (case-insensitive, title or message content).
pub fn search<'a>(chats: &'a [Chat], query: &str) -> Vec<&'a Chat> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return chats.iter().collect();
    }
    chats.iter().filter(|c| c.matches(&needle)).collect()
}

/// Build the sidebar from chats (newest first) and projects.
#[must_use]
pub fn build_sidebar(
    chats: &[Chat],
    projects: &[Project],
    query: &str,
    now: DateTime<Local>,
) -> SidebarView {
    let searching = !query.trim().is_empty();
    let matched = search(chats, query);

    let folders = projects
        .iter()
        .map(|project| ProjectFolder {
            project: project.clone(),
            chats: matched
                .iter()
                .filter(|c| c.project_id.as_deref() == Some(project.id.as_str()))
                .map(|c| ChatSummary::from(*c))
                .collect(),
        })
        .filter(|folder| !searching || !folder.chats.is_empty())
        .collect();

    let mut groups: Vec<(Recency, Vec<ChatSummary>)> = Vec::new();
    for bucket in Recency::ALL {
        let members: Vec<ChatSummary> = matched
            .iter()
            .filter(|c| c.project_id.is_none() && Recency::of(c.date, now) == bucket)
            .map(|c| ChatSummary::from(*c))
            .collect();
        if !members.is_empty() {
            groups.push((bucket, members));
        }
    }

    SidebarView {
        query: query.trim().to_string(),
        folders,
        groups,
        projects: projects.to_vec(),
    }
}
