//! Credential gate in front of every remote administration action.

use tracing::info;

use crate::error::BotError;
use crate::interact::prompt_secret;
use crate::modules::reservation::store::ReservationRecord;
use crate::Context;

/// The creator administers their own reservation freely; anyone else has
/// to produce the exact RCON secret.
pub fn requires_secret(record: &ReservationRecord, requester: u64) -> bool {
    requester != record.creator_id
}

/// Exact match only.
pub fn secret_matches(record: &ReservationRecord, supplied: &str) -> bool {
    supplied == record.rcon
}

/// Owner bypass, otherwise a DM challenge with the 60s window. Timeout,
/// undeliverable DM and mismatch all deny.
pub async fn authorize(ctx: Context<'_>, record: &ReservationRecord) -> Result<(), BotError> {
    if !requires_secret(record, ctx.author().id.get()) {
        return Ok(());
    }
    let reservation_id = record.reservation_id.unwrap_or_default();
    let supplied = prompt_secret(
        ctx,
        &format!("Provide the RCON password for reservation ID `{reservation_id}`."),
    )
    .await?;
    if secret_matches(record, &supplied) {
        info!(
            reservation_id,
            user = %ctx.author().name,
            "cross-user admin action authorized"
        );
        Ok(())
    } else {
        Err(BotError::AuthorizationDenied(
            "Wrong RCON password.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TIMEZONE;
    use chrono::{Duration, TimeZone};

    fn record(creator: u64) -> ReservationRecord {
        let start = TIMEZONE.with_ymd_and_hms(2025, 5, 5, 20, 0, 0).unwrap();
        ReservationRecord {
            reservation_id: Some(100),
            start,
            end: start + Duration::hours(2),
            server_name: "FakkelBrigade #1".into(),
            ip_and_port: "192.0.2.1:27015".into(),
            password: "fish".into(),
            rcon: "fishrcon".into(),
            creator_id: creator,
            creator_name: "alice".into(),
        }
    }

    #[test]
    fn the_creator_is_never_challenged() {
        assert!(!requires_secret(&record(1), 1));
        assert!(requires_secret(&record(1), 2));
    }

    #[test]
    fn only_the_exact_secret_matches() {
        let rec = record(1);
        assert!(secret_matches(&rec, "fishrcon"));
        assert!(!secret_matches(&rec, "fishrcon "));
        assert!(!secret_matches(&rec, "FISHRCON"));
        assert!(!secret_matches(&rec, "wrong"));
    }
}
