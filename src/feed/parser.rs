use feed_rs::parser::{self, ParseFeedError};
use sha2::{Digest, Sha256};

use super::types::Entry;
use crate::util::{make_snippet, strip_control_chars};

/// Longest snippet kept per entry, in characters.
const SNIPPET_MAX_CHARS: usize = 280;

/// Parses RSS/Atom bytes into display entries, in feed order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Entry>, ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated);
            let title = entry
                .title
                .map(|t| strip_control_chars(t.content.trim()).into_owned())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "Untitled".to_string());
            let snippet = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .and_then(|raw| make_snippet(&raw, SNIPPET_MAX_CHARS));

            let existing_id = if entry.id.is_empty() {
                None
            } else {
                Some(entry.id.as_str())
            };
            let guid = generate_guid(
                existing_id,
                link.as_deref(),
                &title,
                published.map(|p| p.timestamp()),
            );

            Entry {
                guid,
                title,
                link,
                published,
                snippet,
            }
        })
        .collect();

    Ok(entries)
}

fn generate_guid(
    existing: Option<&str>,
    url: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        url.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Example</title>
    <item>
        <guid>first</guid>
        <title>First post</title>
        <link>https://example.com/1</link>
        <description>&lt;p&gt;Hello &lt;b&gt;there&lt;/b&gt;&lt;/p&gt;</description>
    </item>
    <item>
        <title>Second post</title>
        <link>https://example.com/2</link>
    </item>
</channel></rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom Example</title>
    <id>urn:example</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <entry>
        <id>urn:example:1</id>
        <title>Atom entry</title>
        <updated>2024-01-01T00:00:00Z</updated>
        <link href="https://example.com/atom/1"/>
    </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_entries_in_order() {
        let entries = parse_feed(RSS.as_bytes()).unwrap();
        let titles: Vec<_> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["First post", "Second post"]);
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(entries[0].snippet.as_deref(), Some("Hello there"));
        assert_eq!(entries[1].snippet, None);
    }

    #[test]
    fn test_parse_atom() {
        let entries = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Atom entry");
        assert!(entries[0].published.is_some());
    }

    #[test]
    fn test_snippet_from_escaped_description() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item>
        <guid>1</guid>
        <title>Entities</title>
        <description>&lt;p&gt;Fish &amp;amp; chips, it&amp;#8217;s 1 &amp;lt; 2&lt;/p&gt;</description>
    </item>
    <item>
        <guid>2</guid>
        <title>Comparison</title>
        <description>if a &lt; b then b &gt; a</description>
    </item>
</channel></rss>"#;

        let entries = parse_feed(rss.as_bytes()).unwrap();
        assert_eq!(
            entries[0].snippet.as_deref(),
            Some("Fish & chips, it\u{2019}s 1 < 2")
        );
        assert_eq!(entries[1].snippet.as_deref(), Some("if a < b then b > a"));
    }

    #[test]
    fn test_invalid_xml_is_error() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }

    #[test]
    fn test_generated_guid_is_stable() {
        let a = generate_guid(None, Some("https://example.com/2"), "Second post", None);
        let b = generate_guid(None, Some("https://example.com/2"), "Second post", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(generate_guid(Some("  id-1 "), None, "x", None), "id-1");
    }
}
