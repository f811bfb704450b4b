/// One entry of the TNG feed, as handed over by the feed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub permalink: String,
    pub description: Option<String>,
    /// Unix epoch seconds.
    pub published_at: i64,
}
