pub mod datetime;
pub mod serde_helpers;
pub mod smilies;
pub mod validation;

pub use datetime::{format_date, format_message_time, format_timestamp};
pub use smilies::parse_smilies;
