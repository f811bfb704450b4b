use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    bucket_by_day, newer_than, render_list, strip_tags, Hooks, PostResult, Watermark,
    ADMIN_URL_OPTION, LAST_READ_OPTION, UPDATE_EVENT,
};
use crate::error::{AppError, Result};
use crate::feed::{feed_url, FeedSource};
use crate::host::Host;
use crate::models::{FeedItem, NewPost, PostStatus, Recurrence, Role, UserId};

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Site settings the job needs besides the hooks.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub feed_endpoint: String,
    pub category: String,
    pub list_class: String,
    pub date_format: String,
    /// `{date}` is replaced with the formatted day.
    pub title_phrase: String,
    pub schedule: String,
    pub utc_offset: FixedOffset,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            feed_endpoint: "tngrss.php".to_string(),
            category: "Genealogy Updates".to_string(),
            list_class: "list-unstyled".to_string(),
            date_format: "%B %d %Y".to_string(),
            title_phrase: "TNG Updates for {date}".to_string(),
            schedule: "daily".to_string(),
            utc_offset: Utc.fix(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    InvalidFeedUrl,
    FetchFailed,
    NoNewItems,
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishSummary {
    pub posts_created: usize,
    pub posts_failed: usize,
    pub watermark: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunReport {
    Skipped(SkipReason),
    Published(PublishSummary),
}

/// Turns new feed items into one post per day.
///
/// Runs are serialised within the process. Two processes sharing one site
/// database must not run the job at the same time; both would read the same
/// watermark and publish the same days twice.
pub struct FeedSyncJob<F, H> {
    feed: F,
    host: H,
    options: JobOptions,
    hooks: Hooks,
    running: Mutex<()>,
}

impl<F: FeedSource, H: Host> FeedSyncJob<F, H> {
    pub fn new(feed: F, host: H, options: JobOptions, hooks: Hooks) -> Self {
        Self {
            feed,
            host,
            options,
            hooks,
            running: Mutex::new(()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Create the category and register the recurring update, once.
    pub async fn activate(&self, now: DateTime<Utc>) -> Result<()> {
        let category = self.host.ensure_category(&self.options.category).await?;
        debug!("Using category '{}' ({})", self.options.category, category);

        let schedule = self.hooks.apply_schedule(self.options.schedule.clone());
        let recurrence: Recurrence = schedule.parse()?;

        if self.host.is_scheduled(UPDATE_EVENT).await? {
            debug!("{} is already scheduled", UPDATE_EVENT);
            return Ok(());
        }

        self.host
            .schedule_recurring(UPDATE_EVENT, recurrence, now)
            .await?;
        info!("Scheduled {} to run {}", UPDATE_EVENT, recurrence);

        Ok(())
    }

    /// Remove the recurring update. The caller must be allowed to manage
    /// plugins; otherwise the event stays registered.
    pub async fn deactivate(&self, caller: UserId) -> Result<()> {
        let allowed = self
            .host
            .user_role(caller)
            .await?
            .is_some_and(|role| role.can_manage_plugins());

        if !allowed {
            warn!("User {} may not deactivate the feed sync", caller);
            return Err(AppError::Unauthorized(format!(
                "user {} cannot manage plugins",
                caller
            )));
        }

        self.host.unschedule(UPDATE_EVENT).await?;
        info!("Unscheduled {}", UPDATE_EVENT);

        Ok(())
    }

    /// Run the job if the scheduler says it is due.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Option<RunReport>> {
        if !self.host.take_due(UPDATE_EVENT, now).await? {
            debug!("{} is not due", UPDATE_EVENT);
            return Ok(None);
        }

        self.run().await.map(Some)
    }

    pub async fn run(&self) -> Result<RunReport> {
        let Ok(_guard) = self.running.try_lock() else {
            warn!("Feed sync is already running, skipping");
            return Ok(RunReport::Skipped(SkipReason::AlreadyRunning));
        };

        let admin_url = self
            .hooks
            .apply_admin_url(self.host.get_option(ADMIN_URL_OPTION).await?)
            .filter(|url| !url.trim().is_empty());

        let Some(admin_url) = admin_url else {
            debug!("No TNG admin URL configured, nothing to do");
            return Ok(RunReport::Skipped(SkipReason::NotConfigured));
        };

        let url = match feed_url(&admin_url, &self.options.feed_endpoint) {
            Ok(url) => url,
            Err(err) => {
                warn!("Can't derive feed URL from '{}': {}", admin_url, err);
                return Ok(RunReport::Skipped(SkipReason::InvalidFeedUrl));
            }
        };

        let items = match self.feed.fetch(&url).await {
            Ok(items) => items,
            Err(err) => {
                warn!("Failed to fetch {}: {}", url, err);
                return Ok(RunReport::Skipped(SkipReason::FetchFailed));
            }
        };

        let watermark =
            Watermark::parse(self.host.get_option(LAST_READ_OPTION).await?.as_deref())?;
        let fresh = newer_than(items, watermark);

        if fresh.is_empty() {
            debug!("No items newer than {}", watermark.0);
            return Ok(RunReport::Skipped(SkipReason::NoNewItems));
        }

        let next_watermark = watermark.advanced_by(&fresh);
        let buckets = bucket_by_day(fresh, self.options.utc_offset);

        let mut summary = PublishSummary {
            posts_created: 0,
            posts_failed: 0,
            watermark: next_watermark.0,
        };

        for (day, items) in &buckets {
            let result = self.publish_day(*day, items).await;

            match &result {
                Ok(id) => {
                    info!("Created post {} for {} ({} items)", id, day, items.len());
                    summary.posts_created += 1;
                }
                Err(err) => {
                    warn!("Failed to create post for {}: {}", day, err);
                    summary.posts_failed += 1;
                }
            }

            self.hooks.notify_new_post(&result);
        }

        self.host
            .set_option(LAST_READ_OPTION, &next_watermark.0.to_string())
            .await?;

        Ok(RunReport::Published(summary))
    }

    async fn publish_day(&self, day: NaiveDate, items: &[FeedItem]) -> PostResult {
        let content = render_list(items, &self.options.list_class, &self.hooks);
        let title = strip_tags(&self.hooks.apply_post_title(self.title_for(day), &content, day));

        let category = self.host.ensure_category(&self.options.category).await?;

        let first_admin = self
            .host
            .list_users(Role::Administrator)
            .await?
            .first()
            .copied();
        let author = self.hooks.apply_author_id(first_admin);
        if author.is_none() {
            warn!("No author for the {} post, creating it without one", day);
        }

        self.host
            .create_post(NewPost {
                title,
                content,
                status: PostStatus::Publish,
                category,
                author,
                publish_date: day.and_time(NaiveTime::MIN),
            })
            .await
    }

    fn title_for(&self, day: NaiveDate) -> String {
        let format = self.hooks.apply_date_format(self.options.date_format.clone());

        let mut date = String::new();
        if write!(date, "{}", day.format(&format)).is_err() {
            warn!("Invalid date format '{}', using {}", format, FALLBACK_DATE_FORMAT);
            date = day.format(FALLBACK_DATE_FORMAT).to_string();
        }

        self.hooks
            .apply_title_phrase(self.options.title_phrase.clone())
            .replace("{date}", &date)
    }
}
