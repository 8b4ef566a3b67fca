use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static FORBIDDEN_USERNAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\?#\s]").unwrap());

/// Outcome of checking a message draft before it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Nothing but whitespace. Sending it is a silent no-op.
    Empty,
    /// Trimmed text ready to send.
    Text(String),
}

/// Trims a draft and checks its length in characters.
pub fn validate_message_content(text: &str, max_length: usize) -> Result<MessageContent> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(MessageContent::Empty);
    }

    if trimmed.chars().count() > max_length {
        return Err(AppError::Validation(format!(
            "Message is too long: at most {} characters",
            max_length
        )));
    }

    Ok(MessageContent::Text(trimmed.to_string()))
}

/// Usernames end up as a path segment, so they must be non-blank and free of separators.
pub fn validate_username(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }

    if FORBIDDEN_USERNAME_CHARS.is_match(username) {
        return Err(AppError::Validation(format!("Invalid username: {}", username)));
    }

    Ok(())
}
