//! Domain errors, all recovered at the command boundary.

use thiserror::Error;

/// Everything that can go wrong while driving a reservation or a remote
/// console call. Each variant renders to a user-facing message; none of
/// them crash the event loop.
#[derive(Error, Debug)]
pub enum BotError {
    /// Malformed time/date/argument input, always user-correctable.
    #[error("{0}")]
    Parse(String),
    /// Non-success reply from the booking API, upstream text passed through.
    #[error("{0}")]
    RemoteService(String),
    /// Upstream 429. Never auto-retried.
    #[error("The booking service is rate limiting us. Wait a minute and try again.")]
    RateLimited,
    #[error("No servers are available for that window.")]
    NoServersAvailable,
    #[error("Time ran out waiting for a reply.")]
    SelectionTimeout,
    #[error("Your DMs are blocked. Open your DMs to receive the RCON password.")]
    PrivateChannelBlocked,
    #[error("{0}")]
    AuthorizationDenied(String),
    /// Remote console call failed or timed out.
    #[error("RCON error: {0}")]
    RemoteCommand(String),
    /// Command issued with no matching reservation.
    #[error("{0}")]
    InvalidSessionState(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<crate::modules::reservation::store::LookupError> for BotError {
    fn from(err: crate::modules::reservation::store::LookupError) -> Self {
        Self::InvalidSessionState(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_renders_distinctly_from_remote_service() {
        let rate = BotError::RateLimited.to_string();
        let remote = BotError::RemoteService("Impossible".into()).to_string();
        assert!(rate.contains("rate limiting"));
        assert_eq!(remote, "Impossible");
        assert_ne!(rate, remote);
    }
}
