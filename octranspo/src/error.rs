//! Error types for the OC Transpo client.

use crate::domain::StopNo;

/// Errors returned by the client and the feed layer beneath it.
///
/// None of these are retried internally; the only resilience mechanism is
/// the cache fallback in `client`, and that masks empty replies only, never
/// errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The HTTP exchange failed: connection, timeout, or a non-2xx status.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The feed answered, but without the expected result element.
    #[error("no reply from {0}")]
    NoReply(&'static str),

    /// The feed embedded an error code in its reply.
    #[error("API error {code}: {message}")]
    Upstream { code: u16, message: String },

    /// A required field was absent or unreadable. Indicates schema drift.
    #[error("missing field: {0}")]
    MissingField(String),

    /// The stop exists but its summary lists no routes. Treated as a hard
    /// error rather than an empty result: asking for a stop with no routes
    /// is a caller mistake.
    #[error("no routes found for stop {0}")]
    NoRoutesFound(StopNo),
}

/// Message for a documented feed error code. Unrecognized codes pass their
/// raw text through.
pub(crate) fn upstream_message(code: u16, raw: &str) -> String {
    match code {
        1 => "Invalid API key".to_string(),
        2 => "Unable to query data source".to_string(),
        10 => "Invalid stop number".to_string(),
        11 => "Invalid route number".to_string(),
        12 => "Stop does not service route".to_string(),
        _ => raw.to_string(),
    }
}
