mod fetcher;

pub use fetcher::FeedFetcher;

use url::Url;

use crate::error::Result;
use crate::models::FeedItem;

#[allow(async_fn_in_trait)]
pub trait FeedSource {
    /// Items in the order the feed lists them.
    async fn fetch(&self, url: &Url) -> Result<Vec<FeedItem>>;
}

/// Derive the feed URL from the TNG admin URL by swapping its last path
/// segment for `endpoint`, e.g. `https://site/tng/admin.php` becomes
/// `https://site/tng/tngrss.php`.
pub fn feed_url(admin_url: &str, endpoint: &str) -> Result<Url> {
    let admin = Url::parse(admin_url.trim())?;
    Ok(admin.join(endpoint)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_admin_script_with_feed_endpoint() {
        let url = feed_url("https://example.com/tng/admin.php", "tngrss.php").unwrap();
        assert_eq!(url.as_str(), "https://example.com/tng/tngrss.php");
    }

    #[test]
    fn keeps_directory_urls() {
        let url = feed_url("https://example.com/genealogy/", "tngrss.php").unwrap();
        assert_eq!(url.as_str(), "https://example.com/genealogy/tngrss.php");
    }

    #[test]
    fn drops_query_of_admin_url() {
        let url = feed_url("https://example.com/admin.php?x=1", "tngrss.php").unwrap();
        assert_eq!(url.as_str(), "https://example.com/tngrss.php");
    }

    #[test]
    fn rejects_relative_admin_url() {
        assert!(feed_url("tng/admin.php", "tngrss.php").is_err());
    }
}
