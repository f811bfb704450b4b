mod feed;
mod post;
mod schedule;

pub use feed::FeedItem;
pub use post::{CategoryId, NewPost, PostId, PostStatus, Role, UserId};
pub use schedule::Recurrence;
