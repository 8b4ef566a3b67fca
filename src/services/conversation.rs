use crate::{
    config::Config,
    error::{AppError, Result},
    models::conversation::{Conversation, ConversationId, ConversationTarget, Message},
    services::{api::SocialApi, poller::PollHandle},
    utils::validation::{validate_message_content, validate_username, MessageContent},
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct ConversationState {
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
    messages: Vec<Message>,
    /// Sends the server confirmed that no fetched history has contained yet.
    unconfirmed: Vec<Message>,
    sending: HashSet<ConversationId>,
    error: Option<String>,
    loaded: bool,
    /// Sequence number of the list load whose result is shown.
    applied: u64,
}

struct StoreCore {
    api: Arc<dyn SocialApi>,
    state: RwLock<ConversationState>,
    max_message_length: usize,
    /// Last sequence number handed to a list load.
    issued: AtomicU64,
}

/// Conversation list, the open conversation's messages and its poll loop.
///
/// Clones share state. The poll loop only holds a weak reference, so dropping the last clone
/// stops it.
#[derive(Clone)]
pub struct ConversationStore {
    core: Arc<StoreCore>,
    poll: Arc<Mutex<Option<PollHandle>>>,
    poll_interval: Duration,
}

/// Releases the per-conversation send slot however the send ends.
struct SendGuard<'a> {
    core: &'a StoreCore,
    conversation_id: ConversationId,
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        self.core.state.write().sending.remove(&self.conversation_id);
    }
}

impl StoreCore {
    async fn load_conversations(&self) -> bool {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.api.conversations().await;

        let mut state = self.state.write();

        // 丢弃过期结果
        if seq < state.applied {
            debug!("Discarding conversation list load #{}: #{} already applied", seq, state.applied);
            return false;
        }

        match result {
            Ok(conversations) => {
                debug!("Loaded {} conversations", conversations.len());
                state.applied = seq;
                state.conversations = conversations;
                state.loaded = true;
                true
            }
            Err(e) => {
                warn!("Failed to load conversations: {}", e);
                state.loaded = true;
                state.error = Some("Failed to load conversations".to_string());
                false
            }
        }
    }

    async fn load_messages(&self, conversation_id: ConversationId) -> bool {
        let fetched = match self.api.messages(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Failed to load messages for conversation {}: {}", conversation_id, e);
                let mut state = self.state.write();
                if state.selected == Some(conversation_id) {
                    state.error = Some("Failed to load messages".to_string());
                }
                return false;
            }
        };

        // 检查是否仍为当前会话
        {
            let mut state = self.state.write();
            if state.selected != Some(conversation_id) {
                debug!(
                    "Discarding messages of conversation {}: selection moved to {:?}",
                    conversation_id, state.selected
                );
                return false;
            }

            // Keep confirmed sends the fetched snapshot predates; drop the ones it now contains.
            let fetched_ids: HashSet<_> = fetched.iter().map(|m| m.id).collect();
            state.unconfirmed.retain(|m| !fetched_ids.contains(&m.id));
            let mut messages = fetched;
            messages.extend(state.unconfirmed.iter().cloned());
            state.messages = messages;
        }

        if let Err(e) = self.api.mark_conversation_read(conversation_id).await {
            warn!("Failed to mark conversation {} as read: {}", conversation_id, e);
        }
        true
    }

    /// Moves the selection. Returns whether it changed.
    fn select(&self, conversation_id: Option<ConversationId>) -> bool {
        let mut state = self.state.write();
        if state.selected == conversation_id {
            return false;
        }
        state.selected = conversation_id;
        state.messages.clear();
        state.unconfirmed.clear();
        true
    }
}

impl ConversationStore {
    pub fn new(api: Arc<dyn SocialApi>, config: &Config) -> Self {
        Self {
            core: Arc::new(StoreCore {
                api,
                state: RwLock::new(ConversationState::default()),
                max_message_length: config.max_message_length,
                issued: AtomicU64::new(0),
            }),
            poll: Arc::new(Mutex::new(None)),
            poll_interval: config.message_poll_interval(),
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.core.state.read().conversations.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.core.state.read().messages.clone()
    }

    pub fn selected_id(&self) -> Option<ConversationId> {
        self.core.state.read().selected
    }

    pub fn selected(&self) -> Option<Conversation> {
        let state = self.core.state.read();
        let id = state.selected?;
        state.conversations.iter().find(|c| c.id == id).cloned()
    }

    /// Whether the first conversation list load has finished, successfully or not.
    pub fn is_loaded(&self) -> bool {
        self.core.state.read().loaded
    }

    pub fn is_sending(&self, conversation_id: ConversationId) -> bool {
        self.core.state.read().sending.contains(&conversation_id)
    }

    pub fn error(&self) -> Option<String> {
        self.core.state.read().error.clone()
    }

    pub fn dismiss_error(&self) {
        self.core.state.write().error = None;
    }

    pub fn total_unread(&self) -> u32 {
        self.core
            .state
            .read()
            .conversations
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    /// Replaces the conversation list with the server's. On failure the previous list stays.
    pub async fn load_conversations(&self) -> bool {
        self.core.load_conversations().await
    }

    /// Replaces the open conversation's messages with the server's history and marks it read.
    /// A result for a conversation that is no longer selected is discarded.
    pub async fn load_messages(&self, conversation_id: ConversationId) -> bool {
        self.core.load_messages(conversation_id).await
    }

    /// Resolves `target` to a conversation and makes it the open one.
    ///
    /// A username goes through the server's get-or-create endpoint; the result is added to the
    /// local list when it is not there yet.
    pub async fn open_conversation(&self, target: impl Into<ConversationTarget>) -> Result<Conversation> {
        let conversation = match target.into() {
            ConversationTarget::Id(id) => {
                if let Some(found) = self.find(id) {
                    found
                } else {
                    // 本地没有则重新加载列表
                    self.load_conversations().await;
                    self.find(id).ok_or_else(|| AppError::not_found("Conversation"))?
                }
            }
            ConversationTarget::Username(username) => {
                validate_username(&username)?;
                debug!("Opening conversation with {}", username);
                let conversation = self.core.api.conversation_with(&username).await.map_err(|e| {
                    warn!("Failed to start conversation with {}: {}", username, e);
                    self.core.state.write().error = Some("Could not start the conversation".to_string());
                    e
                })?;

                // 新会话加入列表
                let mut state = self.core.state.write();
                if !state.conversations.iter().any(|c| c.id == conversation.id) {
                    state.conversations.insert(0, conversation.clone());
                }
                conversation
            }
        };

        self.select(conversation.id).await;
        Ok(conversation)
    }

    /// Opens `conversation_id`: loads its messages now and restarts the poll loop for it.
    /// The previous conversation's loop is cancelled first.
    pub async fn select(&self, conversation_id: ConversationId) {
        if !self.core.select(Some(conversation_id)) && self.is_polling(conversation_id) {
            return;
        }

        self.stop_polling();
        info!("Selected conversation {}", conversation_id);
        self.core.load_messages(conversation_id).await;
        self.start_polling(conversation_id);
    }

    /// Closes the open conversation and stops its poll loop.
    pub fn deselect(&self) {
        self.stop_polling();
        self.core.select(None);
    }

    /// Sends `text` to `conversation_id`.
    ///
    /// Returns `Ok(None)` without contacting the server when the trimmed text is empty or a
    /// send to this conversation is still in flight.
    pub async fn send_message(&self, conversation_id: ConversationId, text: &str) -> Result<Option<Message>> {
        // 校验输入
        let content = match validate_message_content(text, self.core.max_message_length)? {
            MessageContent::Empty => return Ok(None),
            MessageContent::Text(content) => content,
        };

        // 同一会话同时只允许一个发送
        {
            let mut state = self.core.state.write();
            if !state.sending.insert(conversation_id) {
                debug!("Send to conversation {} already in flight", conversation_id);
                return Ok(None);
            }
            state.error = None;
        }
        let guard = SendGuard {
            core: &self.core,
            conversation_id,
        };

        let result = self.core.api.send_message(conversation_id, &content).await;
        drop(guard);

        match result {
            Ok(message) => {
                {
                    let mut state = self.core.state.write();
                    if state.selected == Some(conversation_id)
                        && !state.messages.iter().any(|m| m.id == message.id)
                    {
                        state.messages.push(message.clone());
                        state.unconfirmed.push(message.clone());
                    }
                }
                info!("Sent message {} to conversation {}", message.id, conversation_id);
                self.load_conversations().await;
                Ok(Some(message))
            }
            Err(e) => {
                warn!("Failed to send message to conversation {}: {}", conversation_id, e);
                self.core.state.write().error = Some(e.user_message());
                Err(e)
            }
        }
    }

    pub fn is_polling(&self, conversation_id: ConversationId) -> bool {
        self.poll
            .lock()
            .as_ref()
            .map(|handle| handle.label() == poll_label(conversation_id) && !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops every timer this store owns.
    pub fn shutdown(&self) {
        self.stop_polling();
    }

    fn find(&self, conversation_id: ConversationId) -> Option<Conversation> {
        self.core
            .state
            .read()
            .conversations
            .iter()
            .find(|c| c.id == conversation_id)
            .cloned()
    }

    fn stop_polling(&self) {
        if let Some(handle) = self.poll.lock().take() {
            handle.cancel();
        }
    }

    fn start_polling(&self, conversation_id: ConversationId) {
        let weak: Weak<StoreCore> = Arc::downgrade(&self.core);
        let handle = PollHandle::spawn(poll_label(conversation_id), self.poll_interval, move || {
            let weak = weak.clone();
            async move {
                let Some(core) = weak.upgrade() else {
                    return false;
                };
                tokio::join!(core.load_messages(conversation_id), core.load_conversations());
                true
            }
        });

        *self.poll.lock() = Some(handle);
    }
}

fn poll_label(conversation_id: ConversationId) -> String {
    format!("conversation-{}", conversation_id)
}
