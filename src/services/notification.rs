use crate::{
    config::Config,
    error::{AppError, Result},
    models::{
        friend::FriendRequestId,
        notification::{FeedItem, FeedKey, FriendNotification, NotificationId, PostNotification},
    },
    services::{
        api::SocialApi,
        friends::{FriendRequestAction, FriendsService},
        poller::PollHandle,
        session::SessionStore,
    },
};
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Merges both notification sources into one feed, newest first.
///
/// Items are keyed by `(source, id)`; a repeated key within one source keeps its first
/// occurrence. Equal timestamps keep their input order, posts before friends.
pub fn merge(posts: Vec<PostNotification>, friends: Vec<FriendNotification>) -> Vec<FeedItem> {
    let mut seen: HashSet<FeedKey> = HashSet::with_capacity(posts.len() + friends.len());
    let mut items: Vec<FeedItem> = posts
        .into_iter()
        .map(FeedItem::Post)
        .chain(friends.into_iter().map(FeedItem::Friend))
        .filter(|item| seen.insert(item.key()))
        .collect();

    // `sort_by` is stable.
    items.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    items
}

/// Badge text for an unread count: nothing at zero, "99+" above 99.
pub fn badge_label(count: u32) -> Option<String> {
    match count {
        0 => None,
        1..=99 => Some(count.to_string()),
        _ => Some("99+".to_string()),
    }
}

#[derive(Debug, Default)]
struct FeedState {
    posts: Vec<PostNotification>,
    feed: Vec<FeedItem>,
    /// Server-reported; never recomputed from the listed friend notifications.
    friend_unread: u32,
    error: Option<String>,
    loaded: bool,
    /// Sequence number of the reload whose result is shown.
    applied: u64,
}

struct AggregatorCore {
    api: Arc<dyn SocialApi>,
    friends: FriendsService,
    session: SessionStore,
    state: RwLock<FeedState>,
    /// Last sequence number handed to a reload.
    issued: AtomicU64,
}

impl AggregatorCore {
    async fn load_all(&self) -> u32 {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        // 三个请求同时发出
        let (posts, friends, friend_unread) = tokio::join!(
            self.api.post_notifications(),
            self.api.friend_notifications(),
            self.api.friend_unread_count(),
        );

        let posts = posts.unwrap_or_else(|e| {
            warn!("Failed to load post notifications: {}", e);
            Vec::new()
        });
        let friends = friends.unwrap_or_else(|e| {
            warn!("Failed to load friend notifications: {}", e);
            Vec::new()
        });
        let friend_unread = friend_unread.unwrap_or_else(|e| {
            warn!("Failed to load friend unread count: {}", e);
            0
        });

        let feed = merge(posts.clone(), friends);
        let mut state = self.state.write();

        // 比已显示结果更早发出的请求直接丢弃
        if seq < state.applied {
            debug!("Discarding notification reload #{}: #{} already applied", seq, state.applied);
            return unread_count(&state);
        }

        state.applied = seq;
        state.posts = posts;
        state.feed = feed;
        state.friend_unread = friend_unread;
        state.loaded = true;

        let unread = unread_count(&state);
        debug!("Notification feed has {} items, {} unread", state.feed.len(), unread);
        unread
    }

    fn record_failure(&self, context: &str, e: &AppError) {
        error!("{}: {}", context, e);
        self.state.write().error = Some(e.user_message());
    }
}

fn unread_count(state: &FeedState) -> u32 {
    let unread_posts = state.posts.iter().filter(|n| !n.is_read).count() as u32;
    unread_posts + state.friend_unread
}

/// The merged notification feed and its unread badge.
#[derive(Clone)]
pub struct NotificationAggregator {
    core: Arc<AggregatorCore>,
}

impl NotificationAggregator {
    pub fn new(api: Arc<dyn SocialApi>, session: SessionStore) -> Self {
        Self {
            core: Arc::new(AggregatorCore {
                friends: FriendsService::new(api.clone()),
                api,
                session,
                state: RwLock::new(FeedState::default()),
                issued: AtomicU64::new(0),
            }),
        }
    }

    /// Fetches both feeds and the friend unread count together and rebuilds the merged feed.
    /// A failing source contributes nothing. Returns the new unread count.
    pub async fn load_all(&self) -> u32 {
        self.core.load_all().await
    }

    pub fn feed(&self) -> Vec<FeedItem> {
        self.core.state.read().feed.clone()
    }

    /// Unread posts counted locally plus the server's friend unread count.
    pub fn unread_count(&self) -> u32 {
        unread_count(&self.core.state.read())
    }

    pub fn badge(&self) -> Option<String> {
        badge_label(self.unread_count())
    }

    pub fn is_loaded(&self) -> bool {
        self.core.state.read().loaded
    }

    pub fn error(&self) -> Option<String> {
        self.core.state.read().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.core.state.write().error = None;
    }

    /// Marks one item read on its own source's endpoint, then reloads everything.
    pub async fn mark_as_read(&self, item: &FeedItem) -> Result<()> {
        debug!("Marking {} notification {} as read", item.source(), item.id());
        let result = match item {
            FeedItem::Post(n) => self.core.api.mark_post_notification_read(n.id).await,
            FeedItem::Friend(n) => self.core.api.mark_friend_notification_read(n.id).await,
        };

        if let Err(e) = result {
            self.core.record_failure("Failed to mark notification as read", &e);
            return Err(e);
        }

        self.core.load_all().await;
        Ok(())
    }

    /// Marks every unread post notification one by one and all friend notifications in bulk.
    /// Reloads once both sides are done, even when some calls failed.
    pub async fn mark_all_as_read(&self) -> Result<()> {
        let unread_posts: Vec<NotificationId> = self
            .core
            .state
            .read()
            .posts
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
            .collect();
        debug!("Marking all notifications as read ({} unread posts)", unread_posts.len());

        // 帖子通知逐条标记，好友通知一次全部标记
        let api = &self.core.api;
        let post_calls = join_all(unread_posts.iter().map(|id| api.mark_post_notification_read(*id)));
        let (post_results, friend_result) =
            tokio::join!(post_calls, api.mark_all_friend_notifications_read());

        let first_error = post_results
            .into_iter()
            .chain(std::iter::once(friend_result))
            .find_map(|r| r.err());

        // 无论成功与否都重新加载
        self.core.load_all().await;

        match first_error {
            Some(e) => {
                self.core.record_failure("Failed to mark all notifications as read", &e);
                Err(e)
            }
            None => {
                info!("All notifications marked as read");
                Ok(())
            }
        }
    }

    /// Accepts or rejects the friend request behind a friend-request notification.
    ///
    /// The notification's own read state is left alone; reading it and answering the request
    /// are separate actions.
    pub async fn respond_to_friend_request(
        &self,
        notification: &FriendNotification,
        action: FriendRequestAction,
    ) -> Result<FriendRequestId> {
        // 检查通知类型
        if !notification.is_friend_request() {
            return Err(AppError::validation("Notification is not a friend request"));
        }

        let result = self
            .core
            .friends
            .respond_to_request_from(notification.from_user.id, action)
            .await;

        match result {
            Ok(request_id) => {
                info!(
                    "Friend request {} from user {} answered: {:?}",
                    request_id, notification.from_user.id, action
                );
                self.core.load_all().await;
                Ok(request_id)
            }
            Err(e) => {
                self.core.record_failure("Failed to answer friend request", &e);
                Err(e)
            }
        }
    }

    /// Post notifications not dismissed on this device.
    pub fn active_banners(&self) -> Vec<PostNotification> {
        self.core
            .state
            .read()
            .posts
            .iter()
            .filter(|n| !self.core.session.is_dismissed(n.id))
            .cloned()
            .collect()
    }

    /// Hides a banner for good on this device. The server is told too, but the local list
    /// decides what is shown; feed and unread count are unaffected.
    pub async fn dismiss_banner(&self, id: NotificationId) -> Result<()> {
        // 服务端失败不影响本地隐藏
        if let Err(e) = self.core.api.dismiss_post_notification(id).await {
            warn!("Server refused to dismiss notification {}: {}", id, e);
        }
        self.core.session.dismiss(id)?;
        debug!("Banner {} dismissed", id);
        Ok(())
    }

    /// Reloads the feed every `NOTIFICATION_POLL_INTERVAL_MS`.
    pub fn start_polling(&self, config: &Config) -> NotificationPoller {
        NotificationPoller::start(self, config.notification_poll_interval())
    }
}

/// Background refresh of the notification feed. Stops when dropped.
pub struct NotificationPoller {
    handle: PollHandle,
}

impl NotificationPoller {
    pub fn start(aggregator: &NotificationAggregator, period: Duration) -> Self {
        let weak: Weak<AggregatorCore> = Arc::downgrade(&aggregator.core);
        let handle = PollHandle::spawn("notifications", period, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(core) => {
                        core.load_all().await;
                        true
                    }
                    None => false,
                }
            }
        });
        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn stop(self) {
        self.handle.cancel();
    }
}
