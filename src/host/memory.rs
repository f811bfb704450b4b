use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use super::{ContentStore, Scheduler, SettingsStore};
use crate::error::Result;
use crate::models::{CategoryId, NewPost, PostId, Recurrence, Role, UserId};

#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub recurrence: Recurrence,
    pub next_run: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    options: HashMap<String, String>,
    categories: BTreeMap<String, CategoryId>,
    users: Vec<(UserId, Role)>,
    posts: Vec<(PostId, NewPost)>,
    events: HashMap<String, ScheduledEvent>,
    reject_post_titles: Vec<String>,
}

/// In-memory site used by the unit tests.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_option(self, key: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .options
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_user(self, id: UserId, role: Role) -> Self {
        self.state.lock().unwrap().users.push((id, role));
        self
    }

    /// Make `create_post` fail for posts with this exact title.
    pub fn rejecting_title(self, title: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .reject_post_titles
            .push(title.to_string());
        self
    }

    pub fn option(&self, key: &str) -> Option<String> {
        self.state.lock().unwrap().options.get(key).cloned()
    }

    pub fn posts(&self) -> Vec<NewPost> {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .map(|(_, post)| post.clone())
            .collect()
    }

    pub fn categories(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .categories
            .keys()
            .cloned()
            .collect()
    }

    pub fn event(&self, name: &str) -> Option<ScheduledEvent> {
        self.state.lock().unwrap().events.get(name).cloned()
    }
}

impl SettingsStore for MemoryHost {
    async fn get_option(&self, key: &str) -> Result<Option<String>> {
        Ok(self.option(key))
    }

    async fn set_option(&self, key: &str, value: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .options
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl ContentStore for MemoryHost {
    async fn create_post(&self, post: NewPost) -> Result<PostId> {
        let mut state = self.state.lock().unwrap();
        if state.reject_post_titles.contains(&post.title) {
            return Err(anyhow!("rejected post '{}'", post.title).into());
        }
        let id = state.posts.len() as PostId + 1;
        state.posts.push((id, post));
        Ok(id)
    }

    async fn ensure_category(&self, name: &str) -> Result<CategoryId> {
        let mut state = self.state.lock().unwrap();
        let next = state.categories.len() as CategoryId + 1;
        Ok(*state.categories.entry(name.to_string()).or_insert(next))
    }

    async fn list_users(&self, role: Role) -> Result<Vec<UserId>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn user_role(&self, user: UserId) -> Result<Option<Role>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|(id, _)| *id == user)
            .map(|(_, role)| *role))
    }
}

impl Scheduler for MemoryHost {
    async fn schedule_recurring(
        &self,
        event: &str,
        recurrence: Recurrence,
        first_run: DateTime<Utc>,
    ) -> Result<()> {
        self.state.lock().unwrap().events.insert(
            event.to_string(),
            ScheduledEvent {
                recurrence,
                next_run: first_run,
            },
        );
        Ok(())
    }

    async fn is_scheduled(&self, event: &str) -> Result<bool> {
        Ok(self.state.lock().unwrap().events.contains_key(event))
    }

    async fn unschedule(&self, event: &str) -> Result<()> {
        self.state.lock().unwrap().events.remove(event);
        Ok(())
    }

    async fn take_due(&self, event: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.events.get_mut(event) {
            Some(scheduled) if scheduled.next_run <= now => {
                scheduled.next_run = now + scheduled.recurrence.interval();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
