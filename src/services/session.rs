use crate::{
    error::{AppError, Result},
    models::{notification::NotificationId, user::CurrentUser},
    services::api::SocialApi,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything that survives a restart. Key names match the browser storage the web client uses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct PersistedSession {
    #[serde(default)]
    user: Option<CurrentUser>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default, rename = "dismissedNotifications")]
    dismissed_notifications: Vec<NotificationId>,
}

/// Process-wide session: tokens, the cached current user and locally dismissed banner ids.
///
/// Lifecycle: [`SessionStore::open`] on start, [`SessionStore::clear`] on logout. Clearing keeps
/// the dismissed banner ids; they are never reconciled with the server's own dismiss state.
#[derive(Clone)]
pub struct SessionStore {
    path: Option<PathBuf>,
    state: Arc<RwLock<PersistedSession>>,
}

impl SessionStore {
    /// Loads the session file, starting empty when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        // 文件损坏时从空会话开始
        let state = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<PersistedSession>(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    PersistedSession::default()
                }
            }
        } else {
            PersistedSession::default()
        };

        debug!(
            "Session loaded from {} (authenticated: {})",
            path.display(),
            state.access_token.is_some()
        );

        Ok(Self {
            path: Some(path),
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// A session that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Arc::new(RwLock::new(PersistedSession::default())),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().access_token.is_some()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state.read().refresh_token.clone()
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        self.state.read().user.clone()
    }

    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            state.access_token = Some(access.to_string());
            state.refresh_token = Some(refresh.to_string());
        }
        self.persist()
    }

    pub fn set_user(&self, user: CurrentUser) -> Result<()> {
        self.state.write().user = Some(user);
        self.persist()
    }

    pub async fn login(&self, api: &dyn SocialApi, username: &str, password: &str) -> Result<CurrentUser> {
        debug!("Logging in as {}", username);

        // 验证输入
        if username.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("Username and password are required"));
        }

        // 保存令牌和用户
        let response = api.login(username, password).await?;
        {
            let mut state = self.state.write();
            state.access_token = Some(response.access);
            state.refresh_token = Some(response.refresh);
            state.user = Some(response.user.clone());
        }
        self.persist()?;

        info!("Logged in as {}", response.user.username);
        Ok(response.user)
    }

    /// Tells the server to drop the refresh token, then clears local state whatever the outcome.
    pub async fn logout(&self, api: &dyn SocialApi) -> Result<()> {
        let refresh = self.refresh_token();
        if let Err(e) = api.logout(refresh).await {
            warn!("Logout request failed: {}", e);
        }
        self.clear()
    }

    /// Drops the user and both tokens. Dismissed banner ids stay.
    pub fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write();
            state.user = None;
            state.access_token = None;
            state.refresh_token = None;
        }
        info!("Session cleared");
        self.persist()
    }

    /// Remembers a dismissed banner. The list is append-only.
    pub fn dismiss(&self, id: NotificationId) -> Result<()> {
        {
            let mut state = self.state.write();
            if state.dismissed_notifications.contains(&id) {
                return Ok(());
            }
            state.dismissed_notifications.push(id);
        }
        self.persist()
    }

    pub fn is_dismissed(&self, id: NotificationId) -> bool {
        self.state.read().dismissed_notifications.contains(&id)
    }

    pub fn dismissed_ids(&self) -> Vec<NotificationId> {
        self.state.read().dismissed_notifications.clone()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(&*self.state.read())?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, json)?;
        Ok(())
    }
}
