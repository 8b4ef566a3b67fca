use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Backend configuration
    pub api_base_url: String,
    pub environment: String,
    pub log_level: String,
    pub request_timeout_secs: u64,

    // Polling
    pub message_poll_interval_ms: u64,
    pub notification_poll_interval_ms: u64,

    // Presentation
    pub mobile_breakpoint: u32,

    // Persistent session
    pub session_file: PathBuf,

    // Content settings
    pub max_message_length: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "retro_social_client=debug".to_string()),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,

            message_poll_interval_ms: env::var("MESSAGE_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            notification_poll_interval_ms: env::var("NOTIFICATION_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "30000".to_string())
                .parse()?,

            mobile_breakpoint: env::var("MOBILE_BREAKPOINT")
                .unwrap_or_else(|_| "768".to_string())
                .parse()?,

            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".retro-social/session.json")),

            max_message_length: env::var("MAX_MESSAGE_LENGTH")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,
        })
    }

    pub fn message_poll_interval(&self) -> Duration {
        Duration::from_millis(self.message_poll_interval_ms)
    }

    pub fn notification_poll_interval(&self) -> Duration {
        Duration::from_millis(self.notification_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            environment: "development".to_string(),
            log_level: "retro_social_client=debug".to_string(),
            request_timeout_secs: 30,
            message_poll_interval_ms: 3000,
            notification_poll_interval_ms: 30000,
            mobile_breakpoint: 768,
            session_file: PathBuf::from(".retro-social/session.json"),
            max_message_length: 2000,
        }
    }
}
