use crate::{
    error::{AppError, Result},
    models::{
        friend::{FriendRequest, FriendRequestId, FriendshipState, FriendshipStatus},
        user::UserId,
    },
    services::api::SocialApi,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Answer to an incoming friend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendRequestAction {
    Accept,
    Reject,
}

#[derive(Clone)]
pub struct FriendsService {
    api: Arc<dyn SocialApi>,
}

impl FriendsService {
    pub fn new(api: Arc<dyn SocialApi>) -> Self {
        Self { api }
    }

    pub async fn status(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Fetching friendship status with user {}", user_id);
        self.api.friendship_status(user_id).await
    }

    pub async fn state(&self, user_id: UserId) -> Result<FriendshipState> {
        Ok(self.status(user_id).await?.state())
    }

    pub async fn send_request(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Sending friend request to user {}", user_id);
        self.api.send_friend_request(user_id).await?;
        info!("Friend request sent to user {}", user_id);
        self.status(user_id).await
    }

    pub async fn cancel_request(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Cancelling friend request to user {}", user_id);
        self.api.cancel_friend_request(user_id).await?;
        info!("Friend request to user {} cancelled", user_id);
        self.status(user_id).await
    }

    pub async fn remove_friend(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Removing friend {}", user_id);
        self.api.remove_friend(user_id).await?;
        info!("User {} removed from friends", user_id);
        self.status(user_id).await
    }

    pub async fn block(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Blocking user {}", user_id);
        self.api.block_user(user_id).await?;
        info!("User {} blocked", user_id);
        self.status(user_id).await
    }

    pub async fn unblock(&self, user_id: UserId) -> Result<FriendshipStatus> {
        debug!("Unblocking user {}", user_id);
        self.api.unblock_user(user_id).await?;
        info!("User {} unblocked", user_id);
        self.status(user_id).await
    }

    pub async fn incoming_requests(&self) -> Result<Vec<FriendRequest>> {
        self.api.incoming_requests().await
    }

    pub async fn outgoing_requests(&self) -> Result<Vec<FriendRequest>> {
        self.api.outgoing_requests().await
    }

    pub async fn accept_request(&self, request_id: FriendRequestId) -> Result<()> {
        debug!("Accepting friend request {}", request_id);
        self.api.accept_friend_request(request_id).await?;
        info!("Friend request {} accepted", request_id);
        Ok(())
    }

    pub async fn reject_request(&self, request_id: FriendRequestId) -> Result<()> {
        debug!("Rejecting friend request {}", request_id);
        self.api.reject_friend_request(request_id).await?;
        info!("Friend request {} rejected", request_id);
        Ok(())
    }

    /// Finds the pending incoming request sent by `user_id`.
    ///
    /// Notifications only carry the sender, never the request id, so acting on one always
    /// starts with this lookup.
    pub async fn find_incoming_from(&self, user_id: UserId) -> Result<FriendRequest> {
        self.incoming_requests()
            .await?
            .into_iter()
            .find(|request| request.from_user.id == user_id)
            .ok_or_else(|| {
                warn!("No incoming friend request from user {}", user_id);
                AppError::not_found("Friend request")
            })
    }

    /// Accepts or rejects the incoming request from `user_id`. Returns the id that was acted on.
    pub async fn respond_to_request_from(
        &self,
        user_id: UserId,
        action: FriendRequestAction,
    ) -> Result<FriendRequestId> {
        // 先查找对应的好友请求
        let request = self.find_incoming_from(user_id).await?;
        match action {
            FriendRequestAction::Accept => self.accept_request(request.id).await?,
            FriendRequestAction::Reject => self.reject_request(request.id).await?,
        }
        Ok(request.id)
    }
}
