use std::time::Duration;

use feed_rs::parser;
use reqwest::Client;
use url::Url;

use super::FeedSource;
use crate::error::Result;
use crate::models::FeedItem;

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("tng-digest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }
}

impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<FeedItem>> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await?;
        let items = parse_items(&bytes[..])?;
        tracing::debug!("Fetched {} items from {}", items.len(), url);

        Ok(items)
    }
}

/// Entries without a link or a date can't be placed in a day and are dropped.
pub fn parse_items(bytes: &[u8]) -> Result<Vec<FeedItem>> {
    let feed = parser::parse(bytes)?;

    let items = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let published = entry.published.or(entry.updated)?;
            let permalink = entry.links.first()?.href.clone();

            Some(FeedItem {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                permalink,
                description: entry
                    .summary
                    .map(|s| s.content)
                    .filter(|s| !s.trim().is_empty()),
                published_at: published.timestamp(),
            })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TNG_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Our Family Genealogy</title>
    <link>https://example.com/tng/</link>
    <description>What's new</description>
    <item>
      <title>Jacobs, Nathan</title>
      <link>https://example.com/tng/getperson.php?personID=I12</link>
      <description>Born 1850 &amp;amp; died 1910</description>
      <pubDate>Tue, 02 Jan 2024 09:30:00 +0000</pubDate>
    </item>
    <item>
      <title>Smith, Anna</title>
      <link>https://example.com/tng/getperson.php?personID=I7</link>
      <pubDate>Mon, 01 Jan 2024 18:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Undated</title>
      <link>https://example.com/tng/getperson.php?personID=I9</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_rss_items_in_feed_order() {
        let items = parse_items(TNG_FEED.as_bytes()).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Jacobs, Nathan");
        assert_eq!(
            items[0].permalink,
            "https://example.com/tng/getperson.php?personID=I12"
        );
        assert_eq!(items[0].published_at, 1704187800);
        assert!(items[0].description.is_some());
        assert_eq!(items[1].title, "Smith, Anna");
        assert_eq!(items[1].description, None);
        assert_eq!(items[1].published_at, 1704132000);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_items(b"not a feed").is_err());
    }
}
