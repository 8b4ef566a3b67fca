pub mod api;
pub mod conversation;
pub mod friends;
pub mod notification;
pub mod poller;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出常用类型
pub use api::{HttpApi, SocialApi};
pub use conversation::ConversationStore;
pub use friends::{FriendRequestAction, FriendsService};
pub use notification::{NotificationAggregator, NotificationPoller};
pub use poller::PollHandle;
pub use session::SessionStore;
pub use view::{MessagingView, Panes, ViewController};
