use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::host::{ContentStore, Scheduler, SettingsStore};
use crate::models::{CategoryId, NewPost, PostId, Recurrence, Role, UserId};

use super::schema::SCHEMA;

const POST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored post, as listed by `status`.
#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: PostId,
    pub title: String,
    pub status: String,
    pub category: String,
    pub author_id: Option<UserId>,
    pub post_date: Option<NaiveDateTime>,
}

/// The site database: options, categories, users, posts and scheduled events.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            // Set busy timeout to 5 seconds so a cron tick and a CLI command can overlap
            conn.busy_timeout(std::time::Duration::from_secs(5))?;
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // User operations

    pub async fn add_user(&self, login: &str, role: Role) -> Result<UserId> {
        let login = login.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (login, role) VALUES (?1, ?2)",
                    params![login, role.as_str()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    // Post listing

    pub async fn recent_posts(&self, limit: usize) -> Result<Vec<PostRecord>> {
        let posts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT p.id, p.title, p.status, c.name, p.author_id, p.post_date
                       FROM posts p
                       JOIN categories c ON p.category_id = c.id
                       ORDER BY p.post_date DESC, p.id DESC
                       LIMIT ?1"#,
                )?;
                let posts = stmt
                    .query_map(params![limit as i64], post_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(posts)
            })
            .await?;
        Ok(posts)
    }

    // Schedule inspection

    pub async fn next_run(&self, event: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .load_event(event)
            .await?
            .and_then(|(_, next_run)| parse_datetime(&next_run)))
    }

    async fn load_event(&self, event: &str) -> Result<Option<(String, String)>> {
        let event = event.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        "SELECT recurrence, next_run FROM scheduled_events WHERE name = ?1",
                        params![event],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }
}

impl SettingsStore for Repository {
    async fn get_option(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        let value = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(
                        "SELECT value FROM options WHERE key = ?1",
                        params![key],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(value)
            })
            .await?;
        Ok(value)
    }

    async fn set_option(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO options (key, value) VALUES (?1, ?2)
                       ON CONFLICT(key) DO UPDATE SET
                           value = excluded.value,
                           updated_at = datetime('now')"#,
                    params![key, value],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

impl ContentStore for Repository {
    async fn create_post(&self, post: NewPost) -> Result<PostId> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO posts (title, content, status, category_id, author_id, post_date)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                    params![
                        post.title,
                        post.content,
                        post.status.as_str(),
                        post.category,
                        post.author,
                        post.publish_date.format(POST_DATE_FORMAT).to_string(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    async fn ensure_category(&self, name: &str) -> Result<CategoryId> {
        let name = name.to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
                    params![name],
                )?;
                let id = conn.query_row(
                    "SELECT id FROM categories WHERE name = ?1",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    async fn list_users(&self, role: Role) -> Result<Vec<UserId>> {
        let users = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare("SELECT id FROM users WHERE role = ?1 ORDER BY id")?;
                let users = stmt
                    .query_map(params![role.as_str()], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(users)
            })
            .await?;
        Ok(users)
    }

    async fn user_role(&self, user: UserId) -> Result<Option<Role>> {
        let role: Option<String> = self
            .conn
            .call(move |conn| {
                let role = conn
                    .query_row(
                        "SELECT role FROM users WHERE id = ?1",
                        params![user],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(role)
            })
            .await?;

        role.map(|role| role.parse().map_err(AppError::Config))
            .transpose()
    }
}

impl Scheduler for Repository {
    async fn schedule_recurring(
        &self,
        event: &str,
        recurrence: Recurrence,
        first_run: DateTime<Utc>,
    ) -> Result<()> {
        let event = event.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO scheduled_events (name, recurrence, next_run)
                       VALUES (?1, ?2, ?3)
                       ON CONFLICT(name) DO UPDATE SET
                           recurrence = excluded.recurrence,
                           next_run = excluded.next_run"#,
                    params![event, recurrence.as_str(), first_run.to_rfc3339()],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn is_scheduled(&self, event: &str) -> Result<bool> {
        Ok(self.load_event(event).await?.is_some())
    }

    async fn unschedule(&self, event: &str) -> Result<()> {
        let event = event.to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "DELETE FROM scheduled_events WHERE name = ?1",
                    params![event],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn take_due(&self, event: &str, now: DateTime<Utc>) -> Result<bool> {
        let Some((recurrence, stored_next_run)) = self.load_event(event).await? else {
            return Ok(false);
        };

        let recurrence: Recurrence = recurrence.parse()?;
        let due = parse_datetime(&stored_next_run).map_or(true, |next_run| next_run <= now);
        if !due {
            return Ok(false);
        }

        let event = event.to_string();
        let next_run = (now + recurrence.interval()).to_rfc3339();
        // Only the caller that still sees the old next_run claims the tick
        let claimed = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE scheduled_events SET next_run = ?1 WHERE name = ?2 AND next_run = ?3",
                    params![next_run, event, stored_next_run],
                )?;
                Ok(updated == 1)
            })
            .await?;
        Ok(claimed)
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn post_from_row(row: &Row) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        status: row.get(2)?,
        category: row.get(3)?,
        author_id: row.get(4)?,
        post_date: row
            .get::<_, String>(5)
            .ok()
            .and_then(|s| NaiveDateTime::parse_from_str(&s, POST_DATE_FORMAT).ok()),
    })
}
