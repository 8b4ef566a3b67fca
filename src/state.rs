use crate::{
    config::Config,
    error::Result,
    services::{
        api::{HttpApi, SocialApi},
        conversation::ConversationStore,
        friends::FriendsService,
        notification::NotificationAggregator,
        session::SessionStore,
        view::MessagingView,
    },
};
use std::sync::Arc;

/// Shared client state: configuration, session and every service, wired to one backend.
#[derive(Clone)]
pub struct AppState {
    /// Client configuration
    pub config: Config,

    /// Tokens, current user and dismissed banners
    pub session: SessionStore,

    /// Backend transport
    pub api: Arc<dyn SocialApi>,

    /// Conversations and the open chat
    pub conversations: ConversationStore,

    /// Merged notification feed
    pub notifications: NotificationAggregator,

    /// Friendship relations
    pub friends: FriendsService,
}

impl AppState {
    /// Opens the session file and connects every service to the HTTP backend.
    pub fn connect(config: Config) -> Result<Self> {
        let session = SessionStore::open(&config.session_file)?;
        let api: Arc<dyn SocialApi> = Arc::new(HttpApi::new(&config, session.clone())?);
        Ok(Self::with_api(config, session, api))
    }

    /// Wires the services to any backend implementation.
    pub fn with_api(config: Config, session: SessionStore, api: Arc<dyn SocialApi>) -> Self {
        Self {
            conversations: ConversationStore::new(api.clone(), &config),
            notifications: NotificationAggregator::new(api.clone(), session.clone()),
            friends: FriendsService::new(api.clone()),
            config,
            session,
            api,
        }
    }

    /// A messaging screen over the shared conversation store.
    pub fn messaging_view(&self, width: u32) -> MessagingView {
        MessagingView::new(self.conversations.clone(), &self.config, width)
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.session.login(self.api.as_ref(), username, password).await?;
        Ok(())
    }

    /// Stops the open chat's polling and forgets the session.
    pub async fn logout(&self) -> Result<()> {
        self.conversations.shutdown();
        self.session.logout(self.api.as_ref()).await
    }
}
