use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::models::user::UserSummary;
use crate::utils::serde_helpers::{lenient_id, null_as_default};

pub type FriendRequestId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    #[serde(with = "lenient_id")]
    pub id: FriendRequestId,
    pub from_user: UserSummary,
    pub to_user: UserSummary,
    pub status: FriendRequestStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status_display: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Raw relationship flags between the current user and another user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendshipStatus {
    #[serde(default)]
    pub is_friend: bool,
    #[serde(default)]
    pub is_blocked: bool,
    #[serde(default)]
    pub blocked_by: bool,
    #[serde(default)]
    pub is_subscribed: bool,
    #[serde(default)]
    pub is_subscriber: bool,
    #[serde(default)]
    pub sent_request: bool,
    #[serde(default)]
    pub received_request: bool,
}

/// The single relationship state a profile shows, resolved from the raw flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipState {
    /// The current user blocked the other user.
    Blocked,
    /// The other user blocked the current user.
    BlockedBy,
    Friends,
    RequestSent,
    RequestReceived,
    None,
}

impl FriendshipStatus {
    pub fn state(&self) -> FriendshipState {
        if self.is_blocked {
            FriendshipState::Blocked
        } else if self.blocked_by {
            FriendshipState::BlockedBy
        } else if self.is_friend {
            FriendshipState::Friends
        } else if self.sent_request {
            FriendshipState::RequestSent
        } else if self.received_request {
            FriendshipState::RequestReceived
        } else {
            FriendshipState::None
        }
    }
}
