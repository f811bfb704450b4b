use crate::error::{AppError, Result};
use crate::models::FeedItem;

/// Publish time of the newest item already turned into a post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(pub i64);

impl Watermark {
    /// An absent option means nothing has been read yet.
    pub fn parse(stored: Option<&str>) -> Result<Self> {
        match stored.map(str::trim) {
            None | Some("") => Ok(Watermark(0)),
            Some(value) => value
                .parse()
                .map(Watermark)
                .map_err(|_| AppError::InvalidWatermark(value.to_string())),
        }
    }

    /// The watermark after processing `items`; never moves backwards.
    pub fn advanced_by<'a>(self, items: impl IntoIterator<Item = &'a FeedItem>) -> Self {
        items
            .into_iter()
            .map(|item| Watermark(item.published_at))
            .fold(self, Ord::max)
    }
}

/// Items published strictly after the watermark, in feed order. Items sitting
/// exactly on the watermark were handled by an earlier run.
pub fn newer_than(items: Vec<FeedItem>, watermark: Watermark) -> Vec<FeedItem> {
    items
        .into_iter()
        .filter(|item| item.published_at > watermark.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, published_at: i64) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            permalink: format!("https://example.com/{}", title),
            description: None,
            published_at,
        }
    }

    #[test]
    fn keeps_only_items_after_watermark() {
        let items = vec![item("c", 300), item("b", 200), item("a", 100)];

        let fresh = newer_than(items, Watermark(200));

        assert_eq!(fresh, vec![item("c", 300)]);
    }

    #[test]
    fn refiltering_against_advanced_watermark_is_empty() {
        let items = vec![item("b", 200), item("a", 100), item("c", 150)];

        let fresh = newer_than(items.clone(), Watermark(0));
        let next = Watermark(0).advanced_by(&fresh);

        assert_eq!(next, Watermark(200));
        assert!(newer_than(items, next).is_empty());
    }

    #[test]
    fn watermark_never_decreases() {
        let stale = [item("a", 50)];
        assert_eq!(Watermark(100).advanced_by(&stale), Watermark(100));
        assert_eq!(Watermark(100).advanced_by(&Vec::<FeedItem>::new()), Watermark(100));
    }

    #[test]
    fn parses_stored_values() {
        assert_eq!(Watermark::parse(None).unwrap(), Watermark(0));
        assert_eq!(Watermark::parse(Some("")).unwrap(), Watermark(0));
        assert_eq!(Watermark::parse(Some(" 1704067200\n")).unwrap(), Watermark(1704067200));
        assert!(matches!(
            Watermark::parse(Some("yesterday")),
            Err(AppError::InvalidWatermark(_))
        ));
    }
}
