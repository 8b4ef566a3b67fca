pub mod conversation;
pub mod friend;
pub mod notification;
pub mod response;
pub mod user;

pub use conversation::{Conversation, ConversationId, ConversationTarget, Message, MessageId};
pub use friend::{FriendRequest, FriendRequestId, FriendshipState, FriendshipStatus};
pub use notification::{FeedItem, FeedKey, FriendNotification, NotificationId, NotificationSource, PostNotification};
pub use response::{unwrap_list, ListResponse};
pub use user::{CurrentUser, UserId, UserSummary};
