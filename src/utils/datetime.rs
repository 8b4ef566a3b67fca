use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

/// `HH:MM`, shown next to each chat message.
pub fn format_message_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format("%H:%M").to_string()
}

/// `DD.MM.YYYY`
pub fn format_date<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format("%d.%m.%Y").to_string()
}

/// `DD.MM.YYYY HH:MM`, used in the notification feed.
pub fn format_timestamp<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    time.format("%d.%m.%Y %H:%M").to_string()
}

/// Converts a server timestamp to the machine's local zone before formatting.
pub fn to_local<Tz: TimeZone>(time: &DateTime<Tz>) -> DateTime<Local> {
    time.with_timezone(&Local)
}
