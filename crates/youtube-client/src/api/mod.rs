//! YouTube Data API v3 client.
//!
//! Covers the three calls live chat relaying needs: finding a channel's
//! live broadcast, resolving its live chat id and paging chat messages.
//! Every request carries the API key and a short timeout.

mod request;

use std::time::Duration;

use crate::YouTubeError;
use crate::models::{LiveChatMessageListResponse, SearchListResponse, VideoListResponse};

pub const API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);

/// Quota cost of `search.list`.
pub const SEARCH_COST: u32 = 100;
/// Quota cost of `videos.list`.
pub const VIDEOS_COST: u32 = 1;
/// Approximate quota cost of `liveChatMessages.list`.
pub const CHAT_MESSAGES_COST: u32 = 5;

const CHAT_PAGE_SIZE: &str = "200";

/// YouTube Data API client authenticated with an API key.
#[derive(Clone)]
pub struct YouTubeApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeApiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, YouTubeError> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(YouTubeError::MissingApiKey);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Point the client at another host (API mocks, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Video id of the channel's current live broadcast, if any.
    ///
    /// Costs [`SEARCH_COST`] units.
    pub async fn find_live_video(&self, channel_id: &str) -> Result<Option<String>, YouTubeError> {
        let resp: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("channelId", channel_id),
                    ("eventType", "live"),
                    ("type", "video"),
                    ("maxResults", "1"),
                ],
            )
            .await?;
        let video = resp.items.into_iter().find_map(|item| {
            let title = item.snippet.map(|s| s.title).unwrap_or_default();
            item.id.video_id.filter(|id| !id.is_empty()).map(|id| (id, title))
        });
        if let Some((video_id, title)) = &video {
            tracing::info!(channel_id, video_id = %video_id, title = %title, "Found live broadcast");
        }
        Ok(video.map(|(id, _)| id))
    }

    /// Active live chat id of a video, `None` when the video has no live chat.
    ///
    /// Costs [`VIDEOS_COST`] units.
    pub async fn active_live_chat_id(&self, video_id: &str) -> Result<Option<String>, YouTubeError> {
        let resp: VideoListResponse = self
            .get_json("videos", &[("part", "liveStreamingDetails"), ("id", video_id)])
            .await?;
        Ok(resp
            .items
            .into_iter()
            .filter_map(|video| video.live_streaming_details)
            .find_map(|details| details.active_live_chat_id)
            .filter(|id| !id.is_empty()))
    }

    /// One page of chat messages. Pass the previous page's
    /// `next_page_token` to receive only newer messages.
    ///
    /// Costs about [`CHAT_MESSAGES_COST`] units.
    pub async fn list_chat_messages(
        &self,
        live_chat_id: &str,
        page_token: Option<&str>,
    ) -> Result<LiveChatMessageListResponse, YouTubeError> {
        let mut params = vec![
            ("part", "snippet,authorDetails"),
            ("liveChatId", live_chat_id),
            ("maxResults", CHAT_PAGE_SIZE),
        ];
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            params.push(("pageToken", token));
        }
        self.get_json("liveChat/messages", &params).await
    }
}
