//! Scripted in-memory backend for exercising the sync layer without HTTP.

use crate::{
    error::{AppError, Result},
    models::{
        conversation::{Conversation, ConversationId, Message},
        friend::{FriendRequest, FriendRequestId, FriendRequestStatus, FriendshipStatus},
        notification::{
            FriendNotification, FriendNotificationType, NotificationId, PostNotification,
            PostNotificationType,
        },
        user::{CurrentUser, LoginResponse, UserId, UserSummary},
    },
    services::api::SocialApi,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

pub const ME: UserId = 1;

pub fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
}

pub fn conversation(id: ConversationId, other: UserId, username: &str) -> Conversation {
    Conversation {
        id,
        other_user: UserSummary::new(other, username),
        last_message: None,
        unread_count: 0,
        updated_at: None,
    }
}

pub fn message(id: i64, conversation: ConversationId, sender: UserId, content: &str) -> Message {
    Message {
        id,
        conversation: Some(conversation),
        sender,
        sender_username: String::new(),
        content: content.to_string(),
        created_at: ts((id % 60) as u32),
        is_read: false,
    }
}

pub fn post_notification(id: NotificationId, minute: u32, is_read: bool) -> PostNotification {
    PostNotification {
        id,
        notification_type: PostNotificationType::Like,
        actor: Some(UserSummary::new(100 + id, "fan")),
        post: Some(10),
        title: None,
        message: None,
        category: None,
        is_read,
        created_at: ts(minute),
    }
}

pub fn friend_notification(
    id: NotificationId,
    minute: u32,
    kind: FriendNotificationType,
    from: UserId,
    is_read: bool,
) -> FriendNotification {
    FriendNotification {
        id,
        notification_type: kind,
        from_user: UserSummary::new(from, "friend"),
        type_display: String::new(),
        is_read,
        created_at: ts(minute),
    }
}

pub fn friend_request(id: FriendRequestId, from: UserId) -> FriendRequest {
    FriendRequest {
        id,
        from_user: UserSummary::new(from, "friend"),
        to_user: UserSummary::new(ME, "me"),
        status: FriendRequestStatus::Pending,
        status_display: String::new(),
        created_at: ts(0),
        updated_at: None,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub conversations: Vec<Conversation>,
    pub messages: HashMap<ConversationId, Vec<Message>>,
    pub post_notifications: Vec<PostNotification>,
    pub friend_notifications: Vec<FriendNotification>,
    /// Server-side friend unread counter, kept independent from the listed items.
    pub friend_unread: u32,
    pub incoming: Vec<FriendRequest>,
    pub outgoing: Vec<FriendRequest>,
    pub statuses: HashMap<UserId, FriendshipStatus>,
    pub next_id: i64,
}

/// Backend double with per-endpoint latency and failure switches and a call log.
#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
    calls: Mutex<Vec<String>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
    /// Per-conversation latency for the messages endpoint.
    message_delays: Mutex<HashMap<ConversationId, Duration>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FakeApi {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().next_id = 1000;
        fake
    }

    pub fn with_state(f: impl FnOnce(&mut FakeState)) -> Self {
        let fake = Self::new();
        f(&mut fake.state.lock());
        fake
    }

    pub fn delay(&self, endpoint: &'static str, by: Duration) {
        self.delays.lock().insert(endpoint, by);
    }

    pub fn undelay(&self, endpoint: &'static str) {
        self.delays.lock().remove(endpoint);
    }

    pub fn delay_messages(&self, conversation_id: ConversationId, by: Duration) {
        self.message_delays.lock().insert(conversation_id, by);
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.failing.lock().insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.failing.lock().remove(endpoint);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// List endpoints snapshot their data before this, so a delayed answer is stale.
    async fn enter(&self, endpoint: &'static str, call: String) -> Result<()> {
        self.calls.lock().push(call);
        let delay = self.delays.lock().get(endpoint).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(endpoint) {
            return Err(AppError::internal(&format!("{} unavailable", endpoint)));
        }
        Ok(())
    }
}

#[async_trait]
impl SocialApi for FakeApi {
    async fn login(&self, username: &str, _password: &str) -> Result<LoginResponse> {
        self.enter("login", format!("login {}", username)).await?;
        let user: CurrentUser = serde_json::from_value(serde_json::json!({"id": ME, "username": username}))?;
        Ok(LoginResponse {
            access: "access".to_string(),
            refresh: "refresh".to_string(),
            user,
        })
    }

    async fn logout(&self, _refresh_token: Option<String>) -> Result<()> {
        self.enter("logout", "logout".to_string()).await
    }

    async fn conversations(&self) -> Result<Vec<Conversation>> {
        let snapshot = self.state.lock().conversations.clone();
        self.enter("conversations", "conversations".to_string()).await?;
        Ok(snapshot)
    }

    async fn conversation_with(&self, username: &str) -> Result<Conversation> {
        self.enter("conversation_with", format!("conversation_with {}", username)).await?;
        let mut state = self.state.lock();
        if let Some(existing) = state
            .conversations
            .iter()
            .find(|c| c.other_user.username == username)
        {
            return Ok(existing.clone());
        }
        state.next_id += 1;
        let created = conversation(state.next_id, state.next_id + 500, username);
        state.conversations.insert(0, created.clone());
        Ok(created)
    }

    async fn messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        // Snapshot at request time, like a real server answering before the delay elapses on the wire.
        self.calls.lock().push(format!("messages {}", conversation_id));
        let snapshot = self
            .state
            .lock()
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        let delay = self.message_delays.lock().get(&conversation_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains("messages") {
            return Err(AppError::internal("messages unavailable"));
        }
        Ok(snapshot)
    }

    async fn send_message(&self, conversation_id: ConversationId, content: &str) -> Result<Message> {
        self.enter("send_message", format!("send_message {}", conversation_id)).await?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let sent = message(state.next_id, conversation_id, ME, content);
        state.messages.entry(conversation_id).or_default().push(sent.clone());
        Ok(sent)
    }

    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> Result<()> {
        self.enter("mark_conversation_read", format!("mark_conversation_read {}", conversation_id))
            .await
    }

    async fn post_notifications(&self) -> Result<Vec<PostNotification>> {
        let snapshot = self.state.lock().post_notifications.clone();
        self.enter("post_notifications", "post_notifications".to_string()).await?;
        Ok(snapshot)
    }

    async fn mark_post_notification_read(&self, id: NotificationId) -> Result<()> {
        self.enter("mark_post_notification_read", format!("mark_post_notification_read {}", id))
            .await?;
        if let Some(n) = self.state.lock().post_notifications.iter_mut().find(|n| n.id == id) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn dismiss_post_notification(&self, id: NotificationId) -> Result<()> {
        self.enter("dismiss_post_notification", format!("dismiss_post_notification {}", id))
            .await
    }

    async fn post_unread_count(&self) -> Result<u32> {
        self.enter("post_unread_count", "post_unread_count".to_string()).await?;
        let state = self.state.lock();
        Ok(state.post_notifications.iter().filter(|n| !n.is_read).count() as u32)
    }

    async fn friend_notifications(&self) -> Result<Vec<FriendNotification>> {
        let snapshot = self.state.lock().friend_notifications.clone();
        self.enter("friend_notifications", "friend_notifications".to_string()).await?;
        Ok(snapshot)
    }

    async fn mark_friend_notification_read(&self, id: NotificationId) -> Result<()> {
        self.enter("mark_friend_notification_read", format!("mark_friend_notification_read {}", id))
            .await?;
        let mut state = self.state.lock();
        let mut changed = false;
        if let Some(n) = state.friend_notifications.iter_mut().find(|n| n.id == id) {
            changed = !n.is_read;
            n.is_read = true;
        }
        if changed {
            state.friend_unread = state.friend_unread.saturating_sub(1);
        }
        Ok(())
    }

    async fn mark_all_friend_notifications_read(&self) -> Result<()> {
        self.enter("mark_all_friend_notifications_read", "mark_all_friend_notifications_read".to_string())
            .await?;
        let mut state = self.state.lock();
        for n in state.friend_notifications.iter_mut() {
            n.is_read = true;
        }
        state.friend_unread = 0;
        Ok(())
    }

    async fn friend_unread_count(&self) -> Result<u32> {
        let snapshot = self.state.lock().friend_unread;
        self.enter("friend_unread_count", "friend_unread_count".to_string()).await?;
        Ok(snapshot)
    }

    async fn incoming_requests(&self) -> Result<Vec<FriendRequest>> {
        self.enter("incoming_requests", "incoming_requests".to_string()).await?;
        Ok(self.state.lock().incoming.clone())
    }

    async fn outgoing_requests(&self) -> Result<Vec<FriendRequest>> {
        self.enter("outgoing_requests", "outgoing_requests".to_string()).await?;
        Ok(self.state.lock().outgoing.clone())
    }

    async fn accept_friend_request(&self, request_id: FriendRequestId) -> Result<()> {
        self.enter("accept_friend_request", format!("accept_friend_request {}", request_id))
            .await?;
        let mut state = self.state.lock();
        let position = state
            .incoming
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| AppError::not_found("Friend request"))?;
        let request = state.incoming.remove(position);
        state.statuses.entry(request.from_user.id).or_default().is_friend = true;
        Ok(())
    }

    async fn reject_friend_request(&self, request_id: FriendRequestId) -> Result<()> {
        self.enter("reject_friend_request", format!("reject_friend_request {}", request_id))
            .await?;
        let mut state = self.state.lock();
        let before = state.incoming.len();
        state.incoming.retain(|r| r.id != request_id);
        if state.incoming.len() == before {
            return Err(AppError::not_found("Friend request"));
        }
        Ok(())
    }

    async fn send_friend_request(&self, user_id: UserId) -> Result<()> {
        self.enter("send_friend_request", format!("send_friend_request {}", user_id)).await?;
        self.state.lock().statuses.entry(user_id).or_default().sent_request = true;
        Ok(())
    }

    async fn cancel_friend_request(&self, user_id: UserId) -> Result<()> {
        self.enter("cancel_friend_request", format!("cancel_friend_request {}", user_id)).await?;
        self.state.lock().statuses.entry(user_id).or_default().sent_request = false;
        Ok(())
    }

    async fn remove_friend(&self, user_id: UserId) -> Result<()> {
        self.enter("remove_friend", format!("remove_friend {}", user_id)).await?;
        self.state.lock().statuses.entry(user_id).or_default().is_friend = false;
        Ok(())
    }

    async fn block_user(&self, user_id: UserId) -> Result<()> {
        self.enter("block_user", format!("block_user {}", user_id)).await?;
        let mut state = self.state.lock();
        let status = state.statuses.entry(user_id).or_default();
        status.is_blocked = true;
        status.is_friend = false;
        Ok(())
    }

    async fn unblock_user(&self, user_id: UserId) -> Result<()> {
        self.enter("unblock_user", format!("unblock_user {}", user_id)).await?;
        self.state.lock().statuses.entry(user_id).or_default().is_blocked = false;
        Ok(())
    }

    async fn friendship_status(&self, user_id: UserId) -> Result<FriendshipStatus> {
        self.enter("friendship_status", format!("friendship_status {}", user_id)).await?;
        Ok(self.state.lock().statuses.get(&user_id).copied().unwrap_or_default())
    }
}
