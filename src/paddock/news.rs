use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::newsletter::Story;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unreadable feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Reads an RSS or Atom document into at most `limit` stories. The feed's
/// own title names the source, falling back to `source` when it has none.
pub fn parse_feed(body: &[u8], source: &str, limit: usize) -> Result<Vec<Story>, NewsError> {
    let feed = feed_rs::parser::parse(body)?;
    let source = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| source.to_string());

    Ok(feed
        .entries
        .into_iter()
        .take(limit)
        .map(|entry| Story {
            title: entry.title.map(|t| t.content.trim().to_string()).unwrap_or_default(),
            summary: entry.summary.map(|t| t.content.trim().to_string()).unwrap_or_default(),
            link: entry.links.into_iter().next().map(|l| l.href).unwrap_or_default(),
            source: source.clone(),
        })
        .collect())
}

async fn fetch_feed(client: &reqwest::Client, url: &str, limit: usize) -> Result<Vec<Story>, NewsError> {
    let body = client
        .get(url)
        .timeout(FETCH_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    parse_feed(&body, url, limit)
}

/// Stories from every feed in order, `per_feed` at most from each. A feed
/// that cannot be fetched or parsed is skipped.
pub async fn fetch_stories(client: &reqwest::Client, feeds: &[String], per_feed: usize) -> Vec<Story> {
    let mut stories = Vec::new();
    for url in feeds {
        debug!("Fetching news from {}", url);
        match fetch_feed(client, url, per_feed).await {
            Ok(mut batch) => stories.append(&mut batch),
            Err(e) => warn!("Skipping feed {}: {}", url, e),
        }
    }
    info!("Collected {} stories from {} feeds", stories.len(), feeds.len());
    stories
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Grid Gossip</title>
    <link>https://gridgossip.example.com</link>
    <description>Paddock news</description>
    <item>
      <title>Norris takes pole at Silverstone</title>
      <link>https://gridgossip.example.com/pole</link>
      <description>A late lap snatches it.</description>
    </item>
    <item>
      <title>Ferrari bring a new floor</title>
      <link>https://gridgossip.example.com/floor</link>
      <description>Upgrades for the home of British racing.</description>
    </item>
    <item>
      <title>Rain expected on Sunday</title>
      <link>https://gridgossip.example.com/rain</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
  <updated>2025-07-04T18:30:02Z</updated>
  <entry>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <title>Verstappen fastest in FP2</title>
    <link href="https://atom.example.com/fp2"/>
    <updated>2025-07-04T18:30:02Z</updated>
    <summary>Red Bull top the long runs.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_caps_per_feed() {
        let stories = parse_feed(RSS.as_bytes(), "https://gridgossip.example.com/feed", 2).unwrap();
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "Norris takes pole at Silverstone");
        assert_eq!(stories[0].link, "https://gridgossip.example.com/pole");
        assert_eq!(stories[0].summary, "A late lap snatches it.");
        assert_eq!(stories[1].source, "Grid Gossip");
    }

    #[test]
    fn test_parse_atom_without_title_uses_url() {
        let stories = parse_feed(ATOM.as_bytes(), "https://atom.example.com/feed", 8).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].title, "Verstappen fastest in FP2");
        assert_eq!(stories[0].link, "https://atom.example.com/fp2");
        assert_eq!(stories[0].source, "https://atom.example.com/feed");
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(matches!(
            parse_feed(b"<html><body>not a feed</body></html>", "x", 8),
            Err(NewsError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_feeds_are_skipped() {
        let client = reqwest::Client::new();
        let feeds = vec!["not a url".to_string(), "http://127.0.0.1:1/feed".to_string()];
        assert!(fetch_stories(&client, &feeds, 8).await.is_empty());
    }
}
