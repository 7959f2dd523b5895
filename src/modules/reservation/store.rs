//! In-memory reservation state, shared by every command handler.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use dashmap::DashMap;
use thiserror::Error;

use crate::config::GRACE_HOURS;

/// One booking attempt or confirmation.
///
/// A record without a `reservation_id` is pending: it only bridges the
/// search and confirm steps and is never administrable.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationRecord {
    pub reservation_id: Option<u64>,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub server_name: String,
    pub ip_and_port: String,
    pub password: String,
    pub rcon: String,
    pub creator_id: u64,
    pub creator_name: String,
}

impl ReservationRecord {
    pub fn pending(
        creator_id: u64,
        creator_name: impl Into<String>,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Self {
        Self {
            reservation_id: None,
            start,
            end,
            server_name: String::new(),
            ip_and_port: String::new(),
            password: String::new(),
            rcon: String::new(),
            creator_id,
            creator_name: creator_name.into(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.reservation_id.is_some()
    }

    pub fn is_active_at(&self, now: DateTime<Tz>) -> bool {
        self.start <= now && now <= self.end
    }

    /// The sweep keeps a record visible until one hour past its end.
    pub fn visible_until(&self) -> DateTime<Tz> {
        self.end + Duration::hours(GRACE_HOURS)
    }
}

/// Who an administration or info command is aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LookupTarget {
    /// No explicit target, resolve against the invoking user.
    #[default]
    Requester,
    /// A `@mention` of another member.
    Member { id: u64, display: String },
    /// An explicit reservation id.
    Reservation(u64),
}

impl LookupTarget {
    /// Parse a command token: a user mention or a bare reservation id.
    /// Returns `None` for tokens that are neither, so callers can treat
    /// them as the next positional argument.
    pub fn parse(token: &str) -> Option<Self> {
        if let Some(inner) = token
            .strip_prefix("<@")
            .and_then(|t| t.strip_suffix('>'))
        {
            let id = inner.trim_start_matches('!').parse().ok()?;
            return Some(Self::Member {
                id,
                display: token.to_string(),
            });
        }
        token.parse().ok().map(Self::Reservation)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LookupError {
    #[error("No active reservation.")]
    Empty,
    #[error("Several reservations are active. Use `@creator` or a reservation id.\n\n**Active reservations:**\n{0}")]
    Ambiguous(String),
    #[error("No reservation with ID {0}. Check with `!list`.")]
    UnknownId(u64),
    #[error("No active reservation for {0}.")]
    NoneForMember(String),
    #[error("Reservation ID `{0}` is not active right now.")]
    NotActive(u64),
}

/// Process-wide map from user id to that user's reservations, in insertion
/// order. Appends and removals are atomic per user entry; independent
/// users' flows interleave freely.
#[derive(Debug, Default)]
pub struct SessionStore {
    users: DashMap<u64, Vec<ReservationRecord>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: ReservationRecord) {
        self.users
            .entry(record.creator_id)
            .or_default()
            .push(record);
    }

    /// Drop the user's pending records, keeping confirmed ones. Every abort
    /// path of the reserve flow funnels through here.
    pub fn remove_pending(&self, user_id: u64) {
        if let Some(mut recs) = self.users.get_mut(&user_id) {
            recs.retain(ReservationRecord::is_confirmed);
        }
        self.users.remove_if(&user_id, |_, recs| recs.is_empty());
    }

    /// Remove one confirmed record by its external id.
    pub fn remove(&self, creator_id: u64, reservation_id: u64) -> bool {
        let mut removed = false;
        if let Some(mut recs) = self.users.get_mut(&creator_id) {
            let before = recs.len();
            recs.retain(|r| r.reservation_id != Some(reservation_id));
            removed = recs.len() != before;
        }
        self.users.remove_if(&creator_id, |_, recs| recs.is_empty());
        removed
    }

    /// Does the user hold a confirmed reservation still inside its grace
    /// window? Pending records never count.
    pub fn has_active(&self, user_id: u64, now: DateTime<Tz>) -> bool {
        self.users
            .get(&user_id)
            .map(|recs| {
                recs.iter()
                    .any(|r| r.is_confirmed() && r.visible_until() > now)
            })
            .unwrap_or(false)
    }

    /// Every confirmed record across all users.
    pub fn confirmed(&self) -> Vec<ReservationRecord> {
        self.users
            .iter()
            .flat_map(|entry| {
                entry
                    .value()
                    .iter()
                    .filter(|r| r.is_confirmed())
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn confirmed_for(&self, user_id: u64) -> Vec<ReservationRecord> {
        self.users
            .get(&user_id)
            .map(|recs| {
                recs.iter()
                    .filter(|r| r.is_confirmed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Everything in the store, pending records included.
    pub fn snapshot(&self) -> Vec<ReservationRecord> {
        self.users
            .iter()
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    /// Drop every record past its grace window, then drop emptied users.
    /// Returns how many records went away.
    pub fn sweep(&self, now: DateTime<Tz>) -> usize {
        let mut removed = 0;
        self.users.retain(|_, recs| {
            let before = recs.len();
            recs.retain(|r| r.visible_until() > now);
            removed += before - recs.len();
            !recs.is_empty()
        });
        removed
    }

    /// Resolve the reservation an admin/info command refers to.
    ///
    /// With no explicit target and several confirmed reservations the call
    /// is ambiguous. With exactly one reservation system-wide, a requester
    /// who owns nothing falls back to it (convenience default, see
    /// DESIGN.md). The resolved record must be live right now.
    pub fn find_reservation(
        &self,
        requester: u64,
        target: &LookupTarget,
        now: DateTime<Tz>,
    ) -> Result<ReservationRecord, LookupError> {
        let all = self.confirmed();
        if all.is_empty() {
            return Err(LookupError::Empty);
        }

        let record = match target {
            LookupTarget::Reservation(id) => all
                .iter()
                .find(|r| r.reservation_id == Some(*id))
                .cloned()
                .ok_or(LookupError::UnknownId(*id))?,
            LookupTarget::Member { id, display } => self
                .confirmed_for(*id)
                .into_iter()
                .next()
                .ok_or_else(|| LookupError::NoneForMember(display.clone()))?,
            LookupTarget::Requester => {
                if all.len() > 1 {
                    let listing = all
                        .iter()
                        .map(|r| {
                            format!(
                                "ID `{}`: {} (creator: {})",
                                r.reservation_id.unwrap_or_default(),
                                r.server_name,
                                r.creator_name
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n");
                    return Err(LookupError::Ambiguous(listing));
                }
                all.iter()
                    .find(|r| r.creator_id == requester)
                    .cloned()
                    .unwrap_or_else(|| all[0].clone())
            }
        };

        if !record.is_active_at(now) {
            return Err(LookupError::NotActive(
                record.reservation_id.unwrap_or_default(),
            ));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TIMEZONE;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Tz> {
        TIMEZONE.with_ymd_and_hms(2025, 5, 5, hour, 0, 0).unwrap()
    }

    fn confirmed(id: u64, creator: u64, start: DateTime<Tz>) -> ReservationRecord {
        ReservationRecord {
            reservation_id: Some(id),
            start,
            end: start + Duration::hours(2),
            server_name: format!("Server #{id}"),
            ip_and_port: "192.0.2.1:27015".into(),
            password: "fish".into(),
            rcon: "fishrcon".into(),
            creator_id: creator,
            creator_name: format!("user{creator}"),
        }
    }

    #[test]
    fn pending_records_never_count_as_active() {
        let store = SessionStore::new();
        store.append(ReservationRecord::pending(1, "alice", at(12), at(14)));
        assert!(!store.has_active(1, at(12)));
        store.append(confirmed(100, 1, at(12)));
        assert!(store.has_active(1, at(12)));
    }

    #[test]
    fn active_check_respects_the_grace_window() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10))); // ends 12:00, visible until 13:00
        assert!(store.has_active(1, at(12)));
        assert!(!store.has_active(1, at(14)));
    }

    #[test]
    fn remove_pending_keeps_confirmed_records() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10)));
        store.append(ReservationRecord::pending(1, "alice", at(15), at(17)));
        store.remove_pending(1);
        let left = store.confirmed_for(1);
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].reservation_id, Some(100));
    }

    #[test]
    fn sweep_removes_only_records_past_the_grace_window() {
        let store = SessionStore::new();
        // Ended two hours ago at now=14: end 12:00, visible until 13:00.
        store.append(confirmed(100, 1, at(10)));
        // Ends in one hour at now=14.
        store.append(confirmed(101, 2, at(13)));
        let removed = store.sweep(at(14));
        assert_eq!(removed, 1);
        assert!(store.confirmed_for(1).is_empty());
        assert_eq!(store.confirmed_for(2).len(), 1);
    }

    #[test]
    fn sweep_drops_emptied_users() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(0)));
        store.sweep(at(14));
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn remove_by_id_only_touches_that_record() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10)));
        store.append(confirmed(101, 1, at(10)));
        assert!(store.remove(1, 100));
        assert!(!store.remove(1, 100));
        assert_eq!(store.confirmed_for(1).len(), 1);
    }

    #[test]
    fn target_parsing() {
        assert_eq!(
            LookupTarget::parse("<@42>"),
            Some(LookupTarget::Member {
                id: 42,
                display: "<@42>".into()
            })
        );
        assert_eq!(
            LookupTarget::parse("<@!42>"),
            Some(LookupTarget::Member {
                id: 42,
                display: "<@!42>".into()
            })
        );
        assert_eq!(LookupTarget::parse("12345"), Some(LookupTarget::Reservation(12345)));
        assert_eq!(LookupTarget::parse("cp_process_f12"), None);
    }

    #[test]
    fn lookup_with_empty_store_errors() {
        let store = SessionStore::new();
        assert_eq!(
            store.find_reservation(1, &LookupTarget::Requester, at(12)),
            Err(LookupError::Empty)
        );
    }

    #[test]
    fn lookup_without_target_is_ambiguous_with_several_reservations() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10)));
        store.append(confirmed(101, 2, at(10)));
        assert!(matches!(
            store.find_reservation(1, &LookupTarget::Requester, at(11)),
            Err(LookupError::Ambiguous(_))
        ));
    }

    #[test]
    fn lookup_falls_back_to_the_single_reservation() {
        // Requester 2 owns nothing, but exactly one reservation exists.
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10)));
        let found = store
            .find_reservation(2, &LookupTarget::Requester, at(11))
            .unwrap();
        assert_eq!(found.reservation_id, Some(100));
    }

    #[test]
    fn lookup_by_id_and_member() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(10)));
        store.append(confirmed(101, 2, at(10)));
        let by_id = store
            .find_reservation(3, &LookupTarget::Reservation(101), at(11))
            .unwrap();
        assert_eq!(by_id.creator_id, 2);
        let by_member = store
            .find_reservation(
                3,
                &LookupTarget::Member {
                    id: 1,
                    display: "<@1>".into(),
                },
                at(11),
            )
            .unwrap();
        assert_eq!(by_member.reservation_id, Some(100));
        assert_eq!(
            store.find_reservation(3, &LookupTarget::Reservation(999), at(11)),
            Err(LookupError::UnknownId(999))
        );
    }

    #[test]
    fn lookup_rejects_out_of_window_reservations() {
        let store = SessionStore::new();
        store.append(confirmed(100, 1, at(18)));
        assert_eq!(
            store.find_reservation(1, &LookupTarget::Requester, at(12)),
            Err(LookupError::NotActive(100))
        );
    }
}
