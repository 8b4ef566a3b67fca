//! Messaging and notification sync layer for the Retro Social backend.
//!
//! [`services::ConversationStore`] keeps the conversation list and the open chat fresh by
//! polling, [`services::NotificationAggregator`] merges the post and friend notification feeds,
//! and [`services::MessagingView`] decides between the single- and dual-pane layouts.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::AppState;
