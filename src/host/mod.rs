//! Collaborator contracts the sync job depends on.
//!
//! The job never talks to a database or a cron daemon directly; it goes
//! through these traits. `db::Repository` implements all of them on top of
//! SQLite, and the tests use the in-memory fake in `memory`.

#[cfg(test)]
pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CategoryId, NewPost, PostId, Recurrence, Role, UserId};

/// Key-value option storage.
#[allow(async_fn_in_trait)]
pub trait SettingsStore {
    async fn get_option(&self, key: &str) -> Result<Option<String>>;
    async fn set_option(&self, key: &str, value: &str) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait ContentStore {
    async fn create_post(&self, post: NewPost) -> Result<PostId>;
    async fn ensure_category(&self, name: &str) -> Result<CategoryId>;
    /// User ids holding `role`, oldest account first.
    async fn list_users(&self, role: Role) -> Result<Vec<UserId>>;
    async fn user_role(&self, user: UserId) -> Result<Option<Role>>;
}

#[allow(async_fn_in_trait)]
pub trait Scheduler {
    async fn schedule_recurring(
        &self,
        event: &str,
        recurrence: Recurrence,
        first_run: DateTime<Utc>,
    ) -> Result<()>;
    async fn is_scheduled(&self, event: &str) -> Result<bool>;
    async fn unschedule(&self, event: &str) -> Result<()>;
    /// Returns true when `event` was due at `now`, moving its next run one
    /// interval past `now`.
    async fn take_due(&self, event: &str, now: DateTime<Utc>) -> Result<bool>;
}

/// Everything a site provides to the job.
pub trait Host: SettingsStore + ContentStore + Scheduler {}

impl<T: SettingsStore + ContentStore + Scheduler> Host for T {}
