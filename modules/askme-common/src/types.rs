use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::tag_key::{to_tag_key, to_tag_label};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

// --- Closed vocabularies ---

/// Structural format of a post, chosen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostType {
    Text,
    Poll,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "text",
            PostType::Poll => "poll",
        }
    }

    /// Unknown values fall back to `Text`.
    pub fn normalize(s: &str) -> Self {
        match s {
            "poll" => PostType::Poll,
            _ => PostType::Text,
        }
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a post is about. Assigned from AI classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostCategory {
    Career,
    Relationships,
    Tech,
    Health,
    Finance,
    Fun,
    Opinion,
    Lifestyle,
    Education,
    Other,
}

impl PostCategory {
    pub const ALL: [PostCategory; 10] = [
        PostCategory::Career,
        PostCategory::Relationships,
        PostCategory::Tech,
        PostCategory::Health,
        PostCategory::Finance,
        PostCategory::Fun,
        PostCategory::Opinion,
        PostCategory::Lifestyle,
        PostCategory::Education,
        PostCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PostCategory::Career => "career",
            PostCategory::Relationships => "relationships",
            PostCategory::Tech => "tech",
            PostCategory::Health => "health",
            PostCategory::Finance => "finance",
            PostCategory::Fun => "fun",
            PostCategory::Opinion => "opinion",
            PostCategory::Lifestyle => "lifestyle",
            PostCategory::Education => "education",
            PostCategory::Other => "other",
        }
    }

    /// Exact match against the stored vocabulary.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Unknown values fall back to `Other`.
    pub fn normalize(s: &str) -> Self {
        Self::parse(s).unwrap_or(PostCategory::Other)
    }
}

impl std::fmt::Display for PostCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content seriousness level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostDepth {
    Casual,
    Neutral,
    Serious,
}

impl PostDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostDepth::Casual => "casual",
            PostDepth::Neutral => "neutral",
            PostDepth::Serious => "serious",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "casual" => Some(PostDepth::Casual),
            "neutral" => Some(PostDepth::Neutral),
            "serious" => Some(PostDepth::Serious),
            _ => None,
        }
    }

    /// Unknown values fall back to `Neutral`.
    pub fn normalize(s: &str) -> Self {
        Self::parse(s).unwrap_or(PostDepth::Neutral)
    }
}

impl std::fmt::Display for PostDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery status of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Seen,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Seen => "seen",
            MessageStatus::Failed => "failed",
        }
    }

    /// Unknown values fall back to `Sent`.
    pub fn normalize(s: &str) -> Self {
        match s {
            "sending" => MessageStatus::Sending,
            "delivered" => MessageStatus::Delivered,
            "seen" => MessageStatus::Seen,
            "failed" => MessageStatus::Failed,
            _ => MessageStatus::Sent,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Direct,
    Group,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Direct => "direct",
            ChatType::Group => "group",
        }
    }

    /// Unknown values fall back to `Direct`.
    pub fn normalize(s: &str) -> Self {
        match s {
            "group" => ChatType::Group,
            _ => ChatType::Direct,
        }
    }
}

impl std::fmt::Display for ChatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Tags ---

/// A canonical tag. `key` is unique and derived from the first raw string seen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    pub usage_count: i64,
    pub created_at: i64,
}

impl Tag {
    /// Build a brand-new tag for a raw string nobody has used before.
    pub fn from_raw(raw: &str, created_at: i64) -> Self {
        Self {
            key: to_tag_key(raw),
            label: to_tag_label(raw),
            aliases: vec![raw.to_string()],
            usage_count: 1,
            created_at,
        }
    }

    /// True if `text` is one of the aliases or equals the label, ignoring case.
    pub fn matches_alias_or_label(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.label.to_lowercase() == text || self.aliases.iter().any(|a| a.to_lowercase() == text)
    }
}

// --- Posts ---

/// Raw output of the AI classifier attached to a post creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRawData {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub intent: String,
    #[serde(default)]
    pub depth: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub post_type: PostType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poll_options: Vec<String>,
    pub category: PostCategory,
    pub intent: String,
    pub depth: PostDepth,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A post eligible for a feed, with its tag keys and author already joined.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidatePost {
    pub post: Post,
    pub tags: Vec<String>,
    pub author: Option<AuthorSummary>,
}

// --- Chats ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub post_id: String,
    pub chat_type: ChatType,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    pub status: MessageStatus,
    pub created_at: i64,
}

// --- Feed ---

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedLastMessage {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub status: MessageStatus,
    pub created_at: i64,
    pub formatted_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_reaction: Option<String>,
}

/// Read-time projection of a post for one viewer. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    pub id: String,
    pub post_type: PostType,
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub poll_options: Vec<String>,
    pub category: PostCategory,
    pub intent: String,
    pub depth: PostDepth,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<FeedLastMessage>,
    pub unread_count: i64,
    pub score: f64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}
