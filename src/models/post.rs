use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

pub type PostId = i64;
pub type CategoryId = i64;
pub type UserId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostStatus {
    Publish,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
        }
    }
}

/// A post creation request for the content store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub category: CategoryId,
    pub author: Option<UserId>,
    /// Site-local time.
    pub publish_date: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Editor,
    Author,
    Contributor,
    Subscriber,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Editor => "editor",
            Role::Author => "author",
            Role::Contributor => "contributor",
            Role::Subscriber => "subscriber",
        }
    }

    /// Only administrators may activate or deactivate the job.
    pub fn can_manage_plugins(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "administrator" | "admin" => Ok(Role::Administrator),
            "editor" => Ok(Role::Editor),
            "author" => Ok(Role::Author),
            "contributor" => Ok(Role::Contributor),
            "subscriber" => Ok(Role::Subscriber),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}
