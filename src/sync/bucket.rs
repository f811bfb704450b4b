use std::collections::BTreeMap;

use chrono::{FixedOffset, NaiveDate, TimeZone};

use crate::models::FeedItem;

/// Items grouped by site-local calendar day; iterates oldest day first.
pub type DayBuckets = BTreeMap<NaiveDate, Vec<FeedItem>>;

/// Group items by the day they were published in `offset`. Grouping does not
/// depend on feed order, but items keep their feed order inside a day.
pub fn bucket_by_day(items: Vec<FeedItem>, offset: FixedOffset) -> DayBuckets {
    let mut buckets = DayBuckets::new();

    for item in items {
        match offset.timestamp_opt(item.published_at, 0).single() {
            Some(published) => buckets
                .entry(published.date_naive())
                .or_default()
                .push(item),
            None => tracing::warn!(
                "Skipping '{}': publish time {} is out of range",
                item.title,
                item.published_at
            ),
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAN_1: i64 = 1704067200;
    const JAN_2: i64 = 1704153600;

    fn item(title: &str, published_at: i64) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            permalink: format!("https://example.com/{}", title),
            description: None,
            published_at,
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn same_day_items_share_one_bucket() {
        let items = vec![
            item("a", JAN_1 + 10),
            item("b", JAN_1 + 3600),
            item("c", JAN_1 + 86399),
        ];

        let buckets = bucket_by_day(items, utc());

        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[&day(2024, 1, 1)].len(), 3);
    }

    #[test]
    fn out_of_order_feed_groups_by_day_and_keeps_arrival_order() {
        let items = vec![
            item("second-day-late", JAN_2 + 500),
            item("first-day", JAN_1 + 100),
            item("second-day-early", JAN_2 + 10),
        ];

        let buckets = bucket_by_day(items, utc());

        let days: Vec<_> = buckets.keys().copied().collect();
        assert_eq!(days, vec![day(2024, 1, 1), day(2024, 1, 2)]);
        let titles: Vec<_> = buckets[&day(2024, 1, 2)]
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(titles, vec!["second-day-late", "second-day-early"]);
    }

    #[test]
    fn days_follow_the_site_offset() {
        // 23:30 UTC on Jan 1 is already Jan 2 one hour east of UTC.
        let items = vec![item("late", JAN_1 + 84600)];

        let east = bucket_by_day(items.clone(), FixedOffset::east_opt(3600).unwrap());
        let west = bucket_by_day(items, FixedOffset::west_opt(5 * 3600).unwrap());

        assert!(east.contains_key(&day(2024, 1, 2)));
        assert!(west.contains_key(&day(2024, 1, 1)));
    }
}
