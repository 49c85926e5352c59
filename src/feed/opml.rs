use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

use super::types::FeedDescriptor;

/// SEC-003: Maximum allowed nesting depth for OPML outline elements.
const MAX_OPML_DEPTH: usize = 50;

/// Errors that can occur during OPML parsing.
#[derive(Debug, Error)]
pub enum OpmlError {
    /// SEC-003: OPML nesting depth exceeds safety limit.
    #[error("OPML nesting depth exceeds maximum of {0} levels")]
    MaxDepthExceeded(usize),

    #[error("XML parse error: {0}")]
    XmlParse(String),

    #[error("Failed to read OPML file: {0}")]
    Io(#[from] std::io::Error),
}

impl From<quick_xml::Error> for OpmlError {
    fn from(e: quick_xml::Error) -> Self {
        OpmlError::XmlParse(e.to_string())
    }
}

/// Reads an OPML subscription list and returns its feeds in document order.
///
/// Outlines with an invalid or missing `xmlUrl` are skipped (the former with
/// a warning). Folder outlines are traversed, not returned.
pub async fn parse_file(path: &Path) -> Result<Vec<FeedDescriptor>, OpmlError> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_str(&content)
}

/// Parses OPML content held in memory.
///
/// SEC-002: quick-xml 0.37 never expands `<!ENTITY>` declarations; custom
/// entities surface as an unescape error instead of being resolved.
pub fn parse_str(content: &str) -> Result<Vec<FeedDescriptor>, OpmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut feeds = Vec::new();
    let mut depth: usize = 0;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"outline" => {
                depth += 1;
                if depth > MAX_OPML_DEPTH {
                    return Err(OpmlError::MaxDepthExceeded(MAX_OPML_DEPTH));
                }
                if let Some(feed) = outline_feed(&e, &reader)? {
                    feeds.push(feed);
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"outline" => {
                if let Some(feed) = outline_feed(&e, &reader)? {
                    feeds.push(feed);
                }
            }
            Event::End(e) if e.name().as_ref() == b"outline" => {
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(feeds)
}

fn outline_feed(
    e: &BytesStart<'_>,
    reader: &Reader<&[u8]>,
) -> Result<Option<FeedDescriptor>, OpmlError> {
    let mut xml_url = None;
    let mut title = None;
    let mut text = None;

    for attr in e.attributes() {
        let attr = match attr {
            Ok(attr) => attr,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed OPML attribute");
                continue;
            }
        };
        let value = || attr.decode_and_unescape_value(reader.decoder());
        match attr.key.as_ref() {
            b"xmlUrl" => xml_url = Some(value()?.into_owned()),
            b"title" => title = Some(value()?.into_owned()),
            b"text" => text = Some(value()?.into_owned()),
            _ => {}
        }
    }

    let Some(url) = xml_url else {
        return Ok(None);
    };
    let name = title
        .filter(|t| !t.trim().is_empty())
        .or(text.filter(|t| !t.trim().is_empty()))
        .unwrap_or_else(|| url.clone());

    match FeedDescriptor::new(name, url.as_str()) {
        Ok(feed) => Ok(Some(feed)),
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Skipping invalid feed in OPML");
            Ok(None)
        }
    }
}
