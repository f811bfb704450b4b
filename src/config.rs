use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Recurrence, UserId};
use crate::sync::{Hooks, JobOptions};

const APP_DIR: &str = "tng-digest";
const CONFIG_ENV: &str = "TNG_DIGEST_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub http_timeout_secs: u64,

    pub feed_endpoint: String,
    pub category: String,
    pub list_class: String,
    pub date_format: String,
    pub title_phrase: String,
    pub schedule: String,
    pub utc_offset_minutes: i32,

    /// Markup placed before and after the list in every post.
    pub before_content: String,
    pub after_content: String,
    /// Post as this user instead of the first administrator.
    pub author_id: Option<UserId>,
    /// Overrides the admin URL stored in the site options.
    pub admin_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let job = JobOptions::default();
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);

        Self {
            database_path: data_dir.join("site.db"),
            log_file: None,
            http_timeout_secs: 30,
            feed_endpoint: job.feed_endpoint,
            category: job.category,
            list_class: job.list_class,
            date_format: job.date_format,
            title_phrase: job.title_phrase,
            schedule: job.schedule,
            utc_offset_minutes: 0,
            before_content: String::new(),
            after_content: String::new(),
            author_id: None,
            admin_url: None,
        }
    }
}

impl Config {
    /// Load from `$TNG_DIGEST_CONFIG` or the user config dir; a missing file
    /// means defaults.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => PathBuf::from(path),
            None => Self::default_path(),
        };

        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }

        Self::from_file(&path)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.utc_offset()?;
        self.schedule.parse::<Recurrence>()?;
        if self.feed_endpoint.trim().is_empty() {
            return Err(AppError::Config("feed_endpoint must not be empty".into()));
        }
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            AppError::Config(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            ))
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn job_options(&self) -> Result<JobOptions> {
        Ok(JobOptions {
            feed_endpoint: self.feed_endpoint.clone(),
            category: self.category.clone(),
            list_class: self.list_class.clone(),
            date_format: self.date_format.clone(),
            title_phrase: self.title_phrase.clone(),
            schedule: self.schedule.clone(),
            utc_offset: self.utc_offset()?,
        })
    }

    /// Hooks for the settings that override site data rather than defaults.
    pub fn hooks(&self) -> Hooks {
        let mut hooks = Hooks::default().on_new_post(|result| {
            if let Err(err) = result {
                tracing::error!("Post creation failed: {}", err);
            }
        });

        if !self.before_content.is_empty() {
            let before = self.before_content.clone();
            hooks = hooks.before_content(move |content| content + &before);
        }
        if !self.after_content.is_empty() {
            let after = self.after_content.clone();
            hooks = hooks.after_content(move |content| content + &after);
        }
        if let Some(author) = self.author_id {
            hooks = hooks.author_id(move |_| Some(author));
        }
        if let Some(url) = self.admin_url.clone() {
            hooks = hooks.admin_url(move |_| Some(url.clone()));
        }

        hooks
    }
}
