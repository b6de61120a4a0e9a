//! Discord webhook payloads for video announcements

use serde::{Deserialize, Serialize};
use videodog_common::types::{Destination, FeedItem};

/// Longest first paragraph kept in the embed description.
pub const DESCRIPTION_MAX: usize = 240;

/// Discord webhook message payload
#[derive(Debug, Clone, Serialize, Default)]
pub struct WebhookMessage {
    /// Plain text content, carries the role mention
    pub content: String,

    /// Rich embeds (a single one for announcements)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

/// Discord embed for the announced video
#[derive(Debug, Clone, Serialize, Default)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

/// Body Discord returns with a 429
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Seconds to wait before retrying
    #[serde(default)]
    pub retry_after: Option<f64>,
}

impl WebhookMessage {
    /// Build the announcement for `item` sent to `destination`.
    pub fn announcement(item: &FeedItem, destination: &Destination) -> Self {
        Self {
            content: content_line(item, destination.role_id.as_deref()),
            embeds: vec![video_embed(item)],
        }
    }
}

/// `**title**` and the bare link, followed by the role mention if any.
pub fn content_line(item: &FeedItem, role_id: Option<&str>) -> String {
    let mut content = format!("**{}**\n<{}>", item.title, item.video_url);
    if let Some(role) = role_id {
        content.push_str(&format!(" <@&{role}>"));
    }
    content
}

fn video_embed(item: &FeedItem) -> Embed {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    Embed {
        author: non_empty(&item.channel_name).map(|name| EmbedAuthor { name }),
        title: non_empty(&item.title),
        description: non_empty(&cleanup_description(&item.description)),
        url: non_empty(&item.video_url),
        image: non_empty(&item.thumbnail_url).map(|url| EmbedImage { url }),
    }
}

/// Keep only the first paragraph, capped at [`DESCRIPTION_MAX`] characters.
pub fn cleanup_description(description: &str) -> String {
    let paragraph = description.split('\n').next().unwrap_or_default();
    if paragraph.chars().count() > DESCRIPTION_MAX {
        let head: String = paragraph.chars().take(DESCRIPTION_MAX - 3).collect();
        format!("{head}...")
    } else {
        paragraph.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> FeedItem {
        FeedItem {
            video_id: "abc123".into(),
            channel_name: "Example Channel".into(),
            title: "Big news".into(),
            description: "Short intro.\nSponsors and links.".into(),
            video_url: "https://www.youtube.com/watch?v=abc123".into(),
            thumbnail_url: "https://i1.ytimg.com/vi/abc123/maxresdefault.jpg".into(),
        }
    }

    #[test]
    fn test_content_with_role() {
        assert_eq!(
            content_line(&item(), Some("42")),
            "**Big news**\n<https://www.youtube.com/watch?v=abc123> <@&42>"
        );
    }

    #[test]
    fn test_content_without_role() {
        assert_eq!(
            content_line(&item(), None),
            "**Big news**\n<https://www.youtube.com/watch?v=abc123>"
        );
    }

    #[test]
    fn test_description_first_paragraph() {
        assert_eq!(cleanup_description("one\ntwo\nthree"), "one");
        assert_eq!(cleanup_description(""), "");
    }

    #[test]
    fn test_description_truncated() {
        let long = "é".repeat(300);
        let cleaned = cleanup_description(&long);
        assert_eq!(cleaned.chars().count(), DESCRIPTION_MAX);
        assert!(cleaned.ends_with("..."));

        let exact = "x".repeat(DESCRIPTION_MAX);
        assert_eq!(cleanup_description(&exact), exact);
    }

    #[test]
    fn test_announcement_payload() {
        let destination = Destination {
            webhook_url: "https://discord.com/api/webhooks/1/abc".into(),
            role_id: Some("42".into()),
        };
        let message = WebhookMessage::announcement(&item(), &destination);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["embeds"][0]["author"]["name"], "Example Channel");
        assert_eq!(json["embeds"][0]["title"], "Big news");
        assert_eq!(json["embeds"][0]["description"], "Short intro.");
        assert_eq!(
            json["embeds"][0]["image"]["url"],
            "https://i1.ytimg.com/vi/abc123/maxresdefault.jpg"
        );
        assert!(json["content"].as_str().unwrap().ends_with("<@&42>"));
    }

    #[test]
    fn test_empty_fields_are_omitted() {
        let mut sparse = item();
        sparse.description.clear();
        sparse.channel_name.clear();
        let message = WebhookMessage::announcement(
            &sparse,
            &Destination {
                webhook_url: "https://discord.com/api/webhooks/1/abc".into(),
                role_id: None,
            },
        );
        let json = serde_json::to_value(&message).unwrap();
        assert!(json["embeds"][0].get("description").is_none());
        assert!(json["embeds"][0].get("author").is_none());
    }
}
