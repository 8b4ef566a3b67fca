use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::fmt;

use crate::models::user::UserSummary;
use crate::utils::serde_helpers::{lenient_id, null_as_default};

pub type NotificationId = i64;

/// Which backend feed a notification came from. The two id spaces are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSource {
    Post,
    Friend,
}

impl fmt::Display for NotificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationSource::Post => write!(f, "post"),
            NotificationSource::Friend => write!(f, "friend"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostNotificationType {
    Like,
    Comment,
    #[serde(other)]
    Other,
}

impl Default for PostNotificationType {
    fn default() -> Self {
        PostNotificationType::Other
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostNotification {
    #[serde(with = "lenient_id")]
    pub id: NotificationId,
    #[serde(default)]
    pub notification_type: PostNotificationType,
    #[serde(default)]
    pub actor: Option<UserSummary>,
    #[serde(default)]
    pub post: Option<i64>,
    /// Banner fields; the active-notifications endpoint also carries site announcements.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, alias = "type")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendNotificationType {
    FriendRequest,
    FriendAccepted,
    FriendRejected,
    NewSubscriber,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendNotification {
    #[serde(with = "lenient_id")]
    pub id: NotificationId,
    pub notification_type: FriendNotificationType,
    pub from_user: UserSummary,
    #[serde(default, deserialize_with = "null_as_default")]
    pub type_display: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl FriendNotification {
    pub fn is_friend_request(&self) -> bool {
        self.notification_type == FriendNotificationType::FriendRequest
    }
}

/// Unique key of a merged feed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedKey {
    pub source: NotificationSource,
    pub id: NotificationId,
}

/// One entry of the merged notification feed, tagged by its source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedItem {
    Post(PostNotification),
    Friend(FriendNotification),
}

impl FeedItem {
    pub fn source(&self) -> NotificationSource {
        match self {
            FeedItem::Post(_) => NotificationSource::Post,
            FeedItem::Friend(_) => NotificationSource::Friend,
        }
    }

    pub fn id(&self) -> NotificationId {
        match self {
            FeedItem::Post(n) => n.id,
            FeedItem::Friend(n) => n.id,
        }
    }

    pub fn key(&self) -> FeedKey {
        FeedKey {
            source: self.source(),
            id: self.id(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            FeedItem::Post(n) => n.created_at,
            FeedItem::Friend(n) => n.created_at,
        }
    }

    pub fn is_read(&self) -> bool {
        match self {
            FeedItem::Post(n) => n.is_read,
            FeedItem::Friend(n) => n.is_read,
        }
    }

    /// Short human-readable line for the feed.
    pub fn summary(&self) -> String {
        match self {
            FeedItem::Post(n) => {
                let actor = n
                    .actor
                    .as_ref()
                    .map(|a| a.display_name())
                    .unwrap_or_else(|| "Someone".to_string());
                match (n.notification_type, n.title.as_deref()) {
                    (PostNotificationType::Like, _) => format!("{} liked your post", actor),
                    (PostNotificationType::Comment, _) => format!("{} commented on your post", actor),
                    (PostNotificationType::Other, Some(title)) => title.to_string(),
                    (PostNotificationType::Other, None) => "New notification".to_string(),
                }
            }
            FeedItem::Friend(n) => {
                let label = if n.type_display.is_empty() {
                    match n.notification_type {
                        FriendNotificationType::FriendRequest => "sent you a friend request",
                        FriendNotificationType::FriendAccepted => "accepted your friend request",
                        FriendNotificationType::FriendRejected => "declined your friend request",
                        FriendNotificationType::NewSubscriber => "subscribed to you",
                        FriendNotificationType::Other => "interacted with you",
                    }
                    .to_string()
                } else {
                    n.type_display.clone()
                };
                format!("{}: {}", n.from_user.display_name(), label)
            }
        }
    }
}
