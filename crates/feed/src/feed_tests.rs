//! Parsing tests against a trimmed copy of a real channel feed.

use crate::youtube::{YouTubeFeed, parse_feed, video_id};
use crate::{FeedError, FeedSource};

const CHANNEL_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom">
 <link rel="self" href="http://www.youtube.com/feeds/videos.xml?channel_id=UC_x5XG1OV2P6uZZ5FSM9Ttw"/>
 <id>yt:channel:UC_x5XG1OV2P6uZZ5FSM9Ttw</id>
 <yt:channelId>UC_x5XG1OV2P6uZZ5FSM9Ttw</yt:channelId>
 <title>Example Channel</title>
 <link rel="alternate" href="https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw"/>
 <author>
  <name>Example Channel</name>
  <uri>https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw</uri>
 </author>
 <published>2015-03-09T22:59:39+00:00</published>
 <entry>
  <id>yt:video:aaaaaaaaaa1</id>
  <yt:videoId>aaaaaaaaaa1</yt:videoId>
  <yt:channelId>UC_x5XG1OV2P6uZZ5FSM9Ttw</yt:channelId>
  <title>Newest upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=aaaaaaaaaa1"/>
  <author>
   <name>Example Channel</name>
   <uri>https://www.youtube.com/channel/UC_x5XG1OV2P6uZZ5FSM9Ttw</uri>
  </author>
  <published>2024-05-02T16:00:00+00:00</published>
  <updated>2024-05-02T16:05:00+00:00</updated>
  <media:group>
   <media:title>Newest upload</media:title>
   <media:content url="https://www.youtube.com/v/aaaaaaaaaa1?version=3" type="application/x-shockwave-flash" width="640" height="390"/>
   <media:thumbnail url="https://i1.ytimg.com/vi/aaaaaaaaaa1/hqdefault.jpg" width="480" height="360"/>
   <media:description>First paragraph of the description.
Links and sponsors follow.</media:description>
  </media:group>
 </entry>
 <entry>
  <id>yt:video:bbbbbbbbbb2</id>
  <yt:videoId>bbbbbbbbbb2</yt:videoId>
  <yt:channelId>UC_x5XG1OV2P6uZZ5FSM9Ttw</yt:channelId>
  <title>Older upload</title>
  <link rel="alternate" href="https://www.youtube.com/watch?v=bbbbbbbbbb2"/>
  <author>
   <name>Example Channel</name>
  </author>
  <published>2024-04-20T16:00:00+00:00</published>
  <updated>2024-04-20T16:00:00+00:00</updated>
  <media:group>
   <media:title>Older upload</media:title>
   <media:description></media:description>
  </media:group>
 </entry>
</feed>
"#;

#[test]
fn test_parse_channel_feed() {
    let items = parse_feed(CHANNEL_FEED.as_bytes()).unwrap();
    assert_eq!(items.len(), 2);

    let newest = &items[0];
    assert_eq!(newest.video_id, "aaaaaaaaaa1");
    assert_eq!(newest.channel_name, "Example Channel");
    assert_eq!(newest.title, "Newest upload");
    assert_eq!(newest.video_url, "https://www.youtube.com/watch?v=aaaaaaaaaa1");
    assert!(newest.description.starts_with("First paragraph"));
    assert_eq!(
        newest.thumbnail_url,
        "https://i1.ytimg.com/vi/aaaaaaaaaa1/maxresdefault.jpg"
    );
}

#[test]
fn test_parse_preserves_feed_order() {
    let items = parse_feed(CHANNEL_FEED.as_bytes()).unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.video_id.as_str()).collect();
    assert_eq!(ids, ["aaaaaaaaaa1", "bbbbbbbbbb2"]);
}

#[test]
fn test_parse_empty_feed() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
 <id>yt:channel:empty</id>
 <title>Quiet Channel</title>
</feed>"#;
    let items = parse_feed(xml.as_bytes()).unwrap();
    assert!(items.is_empty());
}

#[test]
fn test_parse_garbage_is_error() {
    let err = parse_feed(b"<html><body>Service Unavailable</body>").unwrap_err();
    assert!(matches!(err, FeedError::Parse(_)));
}

#[test]
fn test_entries_without_video_id_are_skipped() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
 <id>yt:channel:mixed</id>
 <title>Mixed</title>
 <entry>
  <id>tag:example.org,2024:post-1</id>
  <title>Not a video</title>
 </entry>
 <entry>
  <id>yt:video:cccccccccc3</id>
  <title>A video</title>
 </entry>
</feed>"#;
    let items = parse_feed(xml.as_bytes()).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].video_id, "cccccccccc3");
    assert_eq!(
        items[0].video_url,
        "https://www.youtube.com/watch?v=cccccccccc3"
    );
}

#[test]
fn test_video_id_extraction() {
    assert_eq!(video_id("yt:video:abc").as_deref(), Some("abc"));
    assert_eq!(video_id("yt:video:"), None);
    assert_eq!(video_id("yt:channel:abc"), None);
}

#[test]
fn test_feed_url() {
    let feed = YouTubeFeed::new()
        .unwrap()
        .with_base_url("http://127.0.0.1:9/feeds/videos.xml");
    assert_eq!(
        feed.feed_url("UC123"),
        "http://127.0.0.1:9/feeds/videos.xml?channel_id=UC123"
    );
    assert_eq!(feed.name(), "YouTube");
}

#[tokio::test]
async fn test_unreachable_endpoint_is_error() {
    // Port 9 (discard) is never served locally.
    let feed = YouTubeFeed::new()
        .unwrap()
        .with_base_url("http://127.0.0.1:9/feeds/videos.xml");
    let result = feed.fetch("UC123").await;
    assert!(matches!(result, Err(FeedError::Http(_)) | Err(FeedError::Timeout)));
}
