use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        conversation::{Conversation, ConversationId, Message, SendMessageRequest},
        friend::{FriendRequest, FriendRequestId, FriendshipStatus},
        notification::{FriendNotification, NotificationId, PostNotification},
        response::{unwrap_list, CountResponse, ListResponse},
        user::{LoginRequest, LoginResponse, LogoutRequest, UserId},
    },
    services::session::SessionStore,
};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};
use url::Url;

/// Every backend call the synchronization layer makes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialApi: Send + Sync {
    // auth
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse>;
    async fn logout(&self, refresh_token: Option<String>) -> Result<()>;

    // messages
    async fn conversations(&self) -> Result<Vec<Conversation>>;
    async fn conversation_with(&self, username: &str) -> Result<Conversation>;
    async fn messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>>;
    async fn send_message(&self, conversation_id: ConversationId, content: &str) -> Result<Message>;
    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> Result<()>;

    // post notifications
    async fn post_notifications(&self) -> Result<Vec<PostNotification>>;
    async fn mark_post_notification_read(&self, id: NotificationId) -> Result<()>;
    async fn dismiss_post_notification(&self, id: NotificationId) -> Result<()>;
    async fn post_unread_count(&self) -> Result<u32>;

    // friend notifications
    async fn friend_notifications(&self) -> Result<Vec<FriendNotification>>;
    async fn mark_friend_notification_read(&self, id: NotificationId) -> Result<()>;
    async fn mark_all_friend_notifications_read(&self) -> Result<()>;
    async fn friend_unread_count(&self) -> Result<u32>;

    // friendships
    async fn incoming_requests(&self) -> Result<Vec<FriendRequest>>;
    async fn outgoing_requests(&self) -> Result<Vec<FriendRequest>>;
    async fn accept_friend_request(&self, request_id: FriendRequestId) -> Result<()>;
    async fn reject_friend_request(&self, request_id: FriendRequestId) -> Result<()>;
    async fn send_friend_request(&self, user_id: UserId) -> Result<()>;
    async fn cancel_friend_request(&self, user_id: UserId) -> Result<()>;
    async fn remove_friend(&self, user_id: UserId) -> Result<()>;
    async fn block_user(&self, user_id: UserId) -> Result<()>;
    async fn unblock_user(&self, user_id: UserId) -> Result<()>;
    async fn friendship_status(&self, user_id: UserId) -> Result<FriendshipStatus>;
}

/// `SocialApi` over HTTP. Attaches the session's bearer token to every request.
#[derive(Clone)]
pub struct HttpApi {
    base_url: Url,
    http_client: Client,
    session: SessionStore,
}

impl HttpApi {
    pub fn new(config: &Config, session: SessionStore) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        // Relative joins drop the last segment unless the base ends with '/'.
        let mut base = config.api_base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| AppError::Config(format!("Invalid API_BASE_URL '{}': {}", config.api_base_url, e)))?;

        Ok(Self {
            base_url,
            http_client,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path.trim_start_matches('/'))?;
        debug!("{} {}", method, url);

        let mut builder = self.http_client.request(method, url);
        if let Some(token) = self.session.access_token() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await.map_err(|e| {
            error!("Request to backend failed: {}", e);
            AppError::Request(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!("Backend returned error status {}: {}", status, body);
            return Err(AppError::from_response(status, &body));
        }

        // Some mutation endpoints answer 204 or an empty body.
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            error!("Failed to parse backend response: {}", e);
            AppError::Serialization(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path)?;
        self.execute(builder).await
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response: ListResponse<T> = self.get(path).await?;
        Ok(unwrap_list(response))
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let builder = self.request(Method::POST, path)?.json(body);
        self.execute(builder).await
    }

    async fn post_empty(&self, path: &str) -> Result<()> {
        let builder = self.request(Method::POST, path)?;
        let _: serde_json::Value = self.execute(builder).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let builder = self.request(Method::DELETE, path)?;
        let _: serde_json::Value = self.execute(builder).await?;
        Ok(())
    }
}

#[async_trait]
impl SocialApi for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        self.post("auth/login/", &body).await
    }

    async fn logout(&self, refresh_token: Option<String>) -> Result<()> {
        let body = LogoutRequest { refresh: refresh_token };
        let _: serde_json::Value = self.post("auth/logout/", &body).await?;
        Ok(())
    }

    async fn conversations(&self) -> Result<Vec<Conversation>> {
        self.get_list("messages/conversations/").await
    }

    async fn conversation_with(&self, username: &str) -> Result<Conversation> {
        self.get(&format!("messages/conversation/{}/", urlencoding::encode(username)))
            .await
    }

    async fn messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>> {
        self.get_list(&format!("messages/conversations/{}/messages/", conversation_id))
            .await
    }

    async fn send_message(&self, conversation_id: ConversationId, content: &str) -> Result<Message> {
        let body = SendMessageRequest {
            content: content.to_string(),
        };
        self.post(
            &format!("messages/conversations/{}/messages/send/", conversation_id),
            &body,
        )
        .await
    }

    async fn mark_conversation_read(&self, conversation_id: ConversationId) -> Result<()> {
        self.post_empty(&format!("messages/conversations/{}/read/", conversation_id))
            .await
    }

    async fn post_notifications(&self) -> Result<Vec<PostNotification>> {
        self.get_list("notifications/active/").await
    }

    async fn mark_post_notification_read(&self, id: NotificationId) -> Result<()> {
        self.post_empty(&format!("notifications/{}/read/", id)).await
    }

    async fn dismiss_post_notification(&self, id: NotificationId) -> Result<()> {
        self.post_empty(&format!("notifications/{}/dismiss/", id)).await
    }

    async fn post_unread_count(&self) -> Result<u32> {
        let response: CountResponse = self.get("notifications/unread-count/").await?;
        Ok(response.count)
    }

    async fn friend_notifications(&self) -> Result<Vec<FriendNotification>> {
        self.get_list("friends/notifications/").await
    }

    async fn mark_friend_notification_read(&self, id: NotificationId) -> Result<()> {
        self.post_empty(&format!("friends/notifications/{}/read/", id)).await
    }

    async fn mark_all_friend_notifications_read(&self) -> Result<()> {
        self.post_empty("friends/notifications/read-all/").await
    }

    async fn friend_unread_count(&self) -> Result<u32> {
        let response: CountResponse = self.get("friends/notifications/unread-count/").await?;
        Ok(response.count)
    }

    async fn incoming_requests(&self) -> Result<Vec<FriendRequest>> {
        self.get_list("friends/request/incoming/").await
    }

    async fn outgoing_requests(&self) -> Result<Vec<FriendRequest>> {
        self.get_list("friends/request/outgoing/").await
    }

    async fn accept_friend_request(&self, request_id: FriendRequestId) -> Result<()> {
        self.post_empty(&format!("friends/request/accept/{}/", request_id)).await
    }

    async fn reject_friend_request(&self, request_id: FriendRequestId) -> Result<()> {
        self.post_empty(&format!("friends/request/reject/{}/", request_id)).await
    }

    async fn send_friend_request(&self, user_id: UserId) -> Result<()> {
        self.post_empty(&format!("friends/request/send/{}/", user_id)).await
    }

    async fn cancel_friend_request(&self, user_id: UserId) -> Result<()> {
        self.delete(&format!("friends/request/cancel/{}/", user_id)).await
    }

    async fn remove_friend(&self, user_id: UserId) -> Result<()> {
        self.delete(&format!("friends/remove/{}/", user_id)).await
    }

    async fn block_user(&self, user_id: UserId) -> Result<()> {
        self.post_empty(&format!("friends/block/{}/", user_id)).await
    }

    async fn unblock_user(&self, user_id: UserId) -> Result<()> {
        self.delete(&format!("friends/unblock/{}/", user_id)).await
    }

    async fn friendship_status(&self, user_id: UserId) -> Result<FriendshipStatus> {
        self.get(&format!("friends/status/{}/", user_id)).await
    }
}
