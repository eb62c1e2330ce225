pub mod donation;
pub mod error;
pub mod post;
pub mod user;

use chrono::{SecondsFormat, Utc};

/// RFC 3339 UTC with millisecond precision; sorts lexicographically in time order.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
