//! RSS feed fetching and parsing.
//!
//! Produces a [`Podcast`] whose id is derived from the feed URL and whose
//! episodes carry ids derived from each item's `<guid>` (falling back to the
//! enclosure URL, then the title).

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{EntityId, Episode, Podcast};

/// Errors from fetching or parsing a feed
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed request returned status {0}")]
    Status(u16),

    #[error("Feed is empty")]
    Empty,

    #[error("Feed parse error: {0}")]
    Parse(String),
}

/// Download raw feed content
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FeedError> {
    info!(url, "downloading feed");

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FeedError::Status(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(FeedError::Empty);
    }

    info!(bytes = bytes.len(), "downloaded feed");
    Ok(bytes.to_vec())
}

/// Parse raw RSS content into a podcast with linked episodes
pub fn parse_feed(feed_url: &str, xml: &[u8]) -> Result<Podcast, FeedError> {
    if xml.iter().all(u8::is_ascii_whitespace) {
        return Err(FeedError::Empty);
    }

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut channel_title: Option<String> = None;
    let mut seen_channel = false;
    let mut current_item: Option<ItemBuilder> = None;
    let mut episodes = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = element_name(&e);
                match name.as_str() {
                    "channel" => seen_channel = true,
                    "item" => current_item = Some(ItemBuilder::default()),
                    _ => {
                        if let Some(item) = current_item.as_mut() {
                            item.read_attributes(&name, &e)?;
                        }
                    }
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = element_name(&e);
                if let Some(item) = current_item.as_mut() {
                    item.read_attributes(&name, &e)?;
                }
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    if name == "item" {
                        if let Some(builder) = current_item.take() {
                            match builder.build() {
                                Some(episode) => episodes.push(episode),
                                None => debug!("skipping feed item without enclosure"),
                            }
                        }
                    }
                }
            }
            Ok(Event::Text(e)) => {
                // HTML entities such as &nbsp; are common in descriptions
                let text = match e.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&e).into_owned(),
                };
                handle_text(&path, &text, &mut current_item, &mut channel_title);
            }
            Ok(Event::CData(e)) => {
                let raw = e.into_inner();
                let text = String::from_utf8_lossy(&raw);
                handle_text(&path, &text, &mut current_item, &mut channel_title);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    if !seen_channel {
        return Err(FeedError::Parse("no <channel> element".to_string()));
    }

    let title = channel_title.unwrap_or_else(|| feed_url.to_string());
    let podcast = Podcast::new(feed_url, title).with_episodes(episodes);

    info!(
        podcast = %podcast.title,
        episodes = podcast.episodes.len(),
        "parsed feed"
    );

    Ok(podcast)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn handle_text(
    path: &[String],
    text: &str,
    current_item: &mut Option<ItemBuilder>,
    channel_title: &mut Option<String>,
) {
    let Some(element) = path.last() else {
        return;
    };

    if let Some(item) = current_item.as_mut() {
        item.push_text(element, text);
    } else if element == "title" && path.len() >= 2 && path[path.len() - 2] == "channel" {
        channel_title
            .get_or_insert_with(String::new)
            .push_str(text);
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: String,
    guid: String,
    pub_date: String,
    author: String,
    duration: String,
    audio_url: Option<String>,
    size: u64,
    image: String,
}

impl ItemBuilder {
    fn push_text(&mut self, element: &str, text: &str) {
        let field = match element {
            "title" => &mut self.title,
            "guid" => &mut self.guid,
            "pubDate" => &mut self.pub_date,
            "itunes:author" | "author" => &mut self.author,
            "itunes:duration" => &mut self.duration,
            _ => return,
        };
        field.push_str(text);
    }

    fn read_attributes(&mut self, element: &str, e: &BytesStart<'_>) -> Result<(), FeedError> {
        match element {
            "enclosure" => {
                if let Some(url) = attribute(e, "url")? {
                    self.audio_url = Some(url);
                }
                if let Some(length) = attribute(e, "length")? {
                    self.size = length.trim().parse().unwrap_or(0);
                }
            }
            "itunes:image" => {
                if let Some(href) = attribute(e, "href")? {
                    self.image = href;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Option<Episode> {
        let audio_url = self.audio_url?;

        let key = [self.guid.trim(), audio_url.as_str(), self.title.trim()]
            .into_iter()
            .find(|k| !k.is_empty())?
            .to_string();

        let episode = Episode::new(
            EntityId::from_key(&key),
            self.title.trim(),
            audio_url,
            parse_pub_date(&self.pub_date),
        )
        .with_author(self.author.trim())
        .with_duration(parse_duration(&self.duration))
        .with_size(self.size)
        .with_image(self.image);

        Some(episode)
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, FeedError> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|e| FeedError::Parse(format!("bad attribute: {}", e)))?;

    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|e| FeedError::Parse(format!("bad attribute value: {}", e)))?;
            Ok(Some(value.to_string()))
        }
        None => Ok(None),
    }
}

/// Parse an RSS `pubDate` (RFC 2822, RFC 3339 tolerated)
pub fn parse_pub_date(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();

    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Parse `itunes:duration` (`HH:MM:SS`, `MM:SS` or plain seconds)
pub fn parse_duration(raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0;
    }

    let mut total = 0u64;
    for part in raw.split(':') {
        let value = match part.trim().parse::<f64>() {
            Ok(v) if v >= 0.0 => v as u64,
            _ => return 0,
        };
        total = match total.checked_mul(60).and_then(|t| t.checked_add(value)) {
            Some(t) => t,
            None => return 0,
        };
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1:02:03"), 3723);
        assert_eq!(parse_duration("45:10"), 2710);
        assert_eq!(parse_duration("3600"), 3600);
        assert_eq!(parse_duration("90.7"), 90);
        assert_eq!(parse_duration(""), 0);
        assert_eq!(parse_duration("soon"), 0);
        assert_eq!(parse_duration("99999999999999999999999:00"), 0);
        assert_eq!(parse_duration("18446744073709551615:00:00"), 0);
    }

    #[test]
    fn test_parse_pub_date() {
        let date = parse_pub_date("Fri, 01 Mar 2024 12:00:00 +0000");
        assert_eq!(date.to_rfc3339(), "2024-03-01T12:00:00+00:00");

        assert_eq!(parse_pub_date("not a date"), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_empty_feed() {
        assert!(matches!(parse_feed("https://x", b"  \n"), Err(FeedError::Empty)));
    }

    #[test]
    fn test_feed_without_channel() {
        assert!(matches!(
            parse_feed("https://x", b"<html><body/></html>"),
            Err(FeedError::Parse(_))
        ));
    }
}
