//! Watermark filtering, day bucketing and publishing of the TNG feed.

mod bucket;
mod filter;
mod hooks;
mod job;
mod render;

pub use bucket::bucket_by_day;
pub use filter::{newer_than, Watermark};
pub use hooks::{Hooks, PostResult};
pub use job::{FeedSyncJob, JobOptions, RunReport};
pub use render::{render_list, strip_tags};

pub const UPDATE_EVENT: &str = "tng_digest_update";
pub const LAST_READ_OPTION: &str = "last_read";
pub const ADMIN_URL_OPTION: &str = "admin_url";
