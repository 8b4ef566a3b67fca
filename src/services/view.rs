use crate::{
    config::Config,
    error::{AppError, Result},
    models::conversation::{Conversation, ConversationId, Message},
    services::conversation::ConversationStore,
};
use parking_lot::Mutex;
use tracing::{debug, info};

/// Which panes of the messaging screen are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panes {
    /// Desktop: list and chat side by side.
    Dual,
    ListOnly,
    ChatOnly,
}

/// Pure layout decisions from viewport width and selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewController {
    width: u32,
    breakpoint: u32,
}

impl ViewController {
    pub fn new(width: u32, breakpoint: u32) -> Self {
        Self { width, breakpoint }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Widths up to and including the breakpoint are mobile.
    pub fn is_mobile(&self) -> bool {
        self.width <= self.breakpoint
    }

    /// Applies a new width. Returns whether the mode flipped.
    pub fn resize(&mut self, width: u32) -> bool {
        let was_mobile = self.is_mobile();
        self.width = width;
        was_mobile != self.is_mobile()
    }

    pub fn panes(&self, has_selection: bool) -> Panes {
        match (self.is_mobile(), has_selection) {
            (false, _) => Panes::Dual,
            (true, true) => Panes::ChatOnly,
            (true, false) => Panes::ListOnly,
        }
    }

    /// Desktop with nothing open picks the first conversation; mobile waits for a tap.
    pub fn should_auto_select(&self, has_selection: bool, conversation_count: usize) -> bool {
        !self.is_mobile() && !has_selection && conversation_count > 0
    }

    /// Only the mobile chat pane has a back affordance.
    pub fn can_go_back(&self, has_selection: bool) -> bool {
        self.is_mobile() && has_selection
    }
}

/// The messaging screen: conversation store, layout and the unsent draft.
pub struct MessagingView {
    store: ConversationStore,
    layout: Mutex<ViewController>,
    draft: Mutex<String>,
}

impl MessagingView {
    pub fn new(store: ConversationStore, config: &Config, width: u32) -> Self {
        Self {
            store,
            layout: Mutex::new(ViewController::new(width, config.mobile_breakpoint)),
            draft: Mutex::new(String::new()),
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn is_mobile(&self) -> bool {
        self.layout.lock().is_mobile()
    }

    pub fn panes(&self) -> Panes {
        let has_selection = self.store.selected_id().is_some();
        self.layout.lock().panes(has_selection)
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.conversations()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.store.messages()
    }

    pub fn draft(&self) -> String {
        self.draft.lock().clone()
    }

    pub fn set_draft(&self, text: &str) {
        *self.draft.lock() = text.to_string();
    }

    /// Reloads the conversation list, then applies desktop auto-selection.
    pub async fn refresh(&self) -> bool {
        let loaded = self.store.load_conversations().await;
        self.auto_select().await;
        loaded
    }

    /// Re-evaluates the layout. Only presentation changes, except that becoming desktop with
    /// nothing open selects the first conversation.
    pub async fn on_resize(&self, width: u32) -> Panes {
        let flipped = self.layout.lock().resize(width);
        if flipped {
            debug!("Viewport {}px: mobile = {}", width, self.is_mobile());
            self.auto_select().await;
        }
        self.panes()
    }

    pub async fn select(&self, conversation_id: ConversationId) -> Panes {
        self.store.select(conversation_id).await;
        self.panes()
    }

    pub async fn open_with_user(&self, username: &str) -> Result<Conversation> {
        self.store.open_conversation(username).await
    }

    /// Mobile only: chat back to list, clearing the selection.
    pub fn back(&self) -> Panes {
        let has_selection = self.store.selected_id().is_some();
        if self.layout.lock().can_go_back(has_selection) {
            self.store.deselect();
        }
        self.panes()
    }

    /// Sends the draft to the open conversation. The draft is cleared only after the server
    /// confirmed the message; on failure it stays for a retry.
    pub async fn send(&self) -> Result<Option<Message>> {
        let conversation_id = self
            .store
            .selected_id()
            .ok_or_else(|| AppError::validation("No conversation is open"))?;
        let text = self.draft();

        let sent = self.store.send_message(conversation_id, &text).await?;

        // 发送期间草稿被修改则保留
        if sent.is_some() {
            let mut draft = self.draft.lock();
            if *draft == text {
                draft.clear();
            }
        }
        Ok(sent)
    }

    /// Unmount: stops every timer.
    pub fn shutdown(&self) {
        info!("Messaging view closed");
        self.store.shutdown();
    }

    async fn auto_select(&self) {
        let has_selection = self.store.selected_id().is_some();
        let conversations = self.store.conversations();
        let should = self
            .layout
            .lock()
            .should_auto_select(has_selection, conversations.len());

        if let (true, Some(first)) = (should, conversations.first()) {
            debug!("Auto-selecting conversation {}", first.id);
            self.store.select(first.id).await;
        }
    }
}

impl Drop for MessagingView {
    fn drop(&mut self) {
        self.store.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{conversation, message, FakeApi, ME};
    use std::sync::Arc;
    use std::time::Duration;

    fn fake() -> Arc<FakeApi> {
        Arc::new(FakeApi::with_state(|state| {
            state.conversations = vec![conversation(1, 2, "anna"), conversation(2, 3, "boris")];
            state.messages.insert(1, vec![message(10, 1, 2, "hi")]);
            state.messages.insert(2, vec![message(20, 2, ME, "yo")]);
        }))
    }

    fn view(api: Arc<FakeApi>, width: u32) -> MessagingView {
        let config = Config::default();
        MessagingView::new(ConversationStore::new(api, &config), &config, width)
    }

    #[test]
    fn test_breakpoint_is_inclusive() {
        assert!(ViewController::new(768, 768).is_mobile());
        assert!(!ViewController::new(769, 768).is_mobile());
    }

    #[test]
    fn test_panes_per_mode() {
        let desktop = ViewController::new(1024, 768);
        assert_eq!(desktop.panes(false), Panes::Dual);
        assert_eq!(desktop.panes(true), Panes::Dual);
        assert!(!desktop.can_go_back(true));

        let mobile = ViewController::new(500, 768);
        assert_eq!(mobile.panes(false), Panes::ListOnly);
        assert_eq!(mobile.panes(true), Panes::ChatOnly);
        assert!(mobile.can_go_back(true));
    }

    #[test]
    fn test_auto_select_rule() {
        let desktop = ViewController::new(1024, 768);
        assert!(desktop.should_auto_select(false, 2));
        assert!(!desktop.should_auto_select(true, 2));
        assert!(!desktop.should_auto_select(false, 0));
        assert!(!ViewController::new(500, 768).should_auto_select(false, 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_desktop_refresh_auto_selects_first() {
        let api = fake();
        let view = view(api.clone(), 1024);

        assert!(view.refresh().await);
        assert_eq!(view.store().selected_id(), Some(1));
        assert_eq!(view.messages().len(), 1);
        assert_eq!(view.panes(), Panes::Dual);
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_after_failed_start_recovers() {
        let api = fake();
        api.fail("conversations");
        let view = view(api.clone(), 1024);

        assert!(!view.refresh().await);
        assert_eq!(view.store().selected_id(), None);
        assert!(view.conversations().is_empty());

        api.recover("conversations");
        assert!(view.refresh().await);
        assert_eq!(view.conversations().len(), 2);
        assert_eq!(view.store().selected_id(), Some(1));
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_mobile_refresh_waits_for_tap() {
        let api = fake();
        let view = view(api.clone(), 500);

        view.refresh().await;
        assert_eq!(view.store().selected_id(), None);
        assert_eq!(view.panes(), Panes::ListOnly);
        assert_eq!(api.count("messages"), 0);

        assert_eq!(view.select(2).await, Panes::ChatOnly);
        assert_eq!(view.back(), Panes::ListOnly);
        assert_eq!(view.store().selected_id(), None);
        assert!(!view.store().is_polling(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_with_open_chat_refetches_nothing() {
        let api = fake();
        let view = view(api.clone(), 1024);
        view.refresh().await;
        view.select(2).await;
        api.clear_calls();

        assert_eq!(view.on_resize(500).await, Panes::ChatOnly);
        assert!(api.calls().is_empty());
        assert_eq!(view.store().selected_id(), Some(2));
        assert_eq!(view.messages().len(), 1);
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_growing_to_desktop_auto_selects() {
        let api = fake();
        let view = view(api.clone(), 500);
        view.refresh().await;

        assert_eq!(view.on_resize(600).await, Panes::ListOnly);
        assert_eq!(view.store().selected_id(), None);

        assert_eq!(view.on_resize(1280).await, Panes::Dual);
        assert_eq!(view.store().selected_id(), Some(1));
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_is_ignored_on_desktop() {
        let api = fake();
        let view = view(api, 1024);
        view.refresh().await;

        assert_eq!(view.back(), Panes::Dual);
        assert_eq!(view.store().selected_id(), Some(1));
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_keeps_draft() {
        let api = fake();
        let view = view(api.clone(), 1024);
        view.refresh().await;

        view.set_draft("see you :)");
        api.fail("send_message");
        assert!(view.send().await.is_err());
        assert_eq!(view.draft(), "see you :)");
        assert!(view.store().error().is_some());

        api.recover("send_message");
        let sent = view.send().await.unwrap().unwrap();
        assert_eq!(sent.content, "see you :)");
        assert_eq!(view.draft(), "");
        view.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let api = fake();
        let view = view(api.clone(), 1024);
        view.refresh().await;
        view.shutdown();
        api.clear_calls();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_send_without_selection_is_rejected() {
        let view = view(fake(), 500);
        view.set_draft("hello");
        assert!(matches!(view.send().await, Err(AppError::Validation(_))));
        assert_eq!(view.draft(), "hello");
    }
}
