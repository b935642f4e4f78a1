//! YouTube Data API v3 response models.
//!
//! Only the fields the relay reads are modeled. Everything is defaulted so a
//! missing field never fails a whole page.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchListResponse {
    #[serde(default)]
    pub items: Vec<SearchResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub id: SearchResultId,
    #[serde(default)]
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultId {
    #[serde(default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub live_broadcast_content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<Video>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStreamingDetails {
    #[serde(default)]
    pub active_live_chat_id: Option<String>,
    #[serde(default)]
    pub actual_end_time: Option<String>,
}

/// One page of `liveChatMessages.list`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessageListResponse {
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub polling_interval_millis: Option<u64>,
    /// Set once the broadcast has gone offline.
    #[serde(default)]
    pub offline_at: Option<String>,
    #[serde(default)]
    pub items: Vec<LiveChatMessage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub snippet: LiveChatSnippet,
    #[serde(default)]
    pub author_details: Option<AuthorDetails>,
}

impl LiveChatMessage {
    /// Message text, preferring the plain text of a text message over the
    /// rendered display string.
    pub fn text(&self) -> Option<&str> {
        self.snippet
            .text_message_details
            .as_ref()
            .and_then(|d| d.message_text.as_deref())
            .or(self.snippet.display_message.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn is_chat_ended(&self) -> bool {
        self.snippet.kind == "chatEndedEvent"
    }

    /// Author channel id from either the details block or the snippet.
    pub fn author_channel_id(&self) -> Option<&str> {
        self.author_details
            .as_ref()
            .and_then(|a| a.channel_id.as_deref())
            .or(self.snippet.author_channel_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveChatSnippet {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub author_channel_id: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub display_message: Option<String>,
    #[serde(default)]
    pub text_message_details: Option<TextMessageDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessageDetails {
    #[serde(default)]
    pub message_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorDetails {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub is_chat_owner: bool,
    #[serde(default)]
    pub is_chat_sponsor: bool,
    #[serde(default)]
    pub is_chat_moderator: bool,
}

/// Google API error envelope: `{"error": {"code", "message", "errors": [{"reason"}]}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GoogleErrorResponse {
    #[serde(default)]
    pub error: GoogleError,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GoogleError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<GoogleErrorItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct GoogleErrorItem {
    #[serde(default)]
    pub reason: String,
}
