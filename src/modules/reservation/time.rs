//! `!reserve` argument parsing: time of day, optional date, optional
//! connection password.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::config::{
    DEFAULT_PASSWORD, MSG_DATE_TOO_FAR, MSG_INVALID_DATE, MSG_INVALID_TIME, MSG_USAGE,
    RESERVATION_HOURS, TIMEZONE,
};
use crate::error::BotError;

/// A fully parsed reservation request. `end` is always `start + 2h`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveRequest {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub password: String,
    /// The user supplied their own password, which also selects the
    /// default RCON secret instead of a DM prompt.
    pub custom_password: bool,
    /// Literal `now` was given; the open notice is sent immediately.
    pub starts_now: bool,
}

/// Accepted forms, all interpreted in the reference timezone:
/// `now [password]`, `<HH:MM|HHhMM> [password]`,
/// `<YYYY-MM-DD> <HH:MM|HHhMM> [password]`.
/// A bare time already past today rolls over to tomorrow.
pub fn parse_reserve_args(args: &str, now: DateTime<Tz>) -> Result<ReserveRequest, BotError> {
    let parts: Vec<&str> = args.split_whitespace().collect();

    let (date_str, time_str, password) = match parts.as_slice() {
        [] => return Err(BotError::Parse(MSG_USAGE.into())),
        [first, rest @ ..] if first.eq_ignore_ascii_case("now") => match rest {
            [] => (None, None, None),
            [password] => (None, None, Some(*password)),
            _ => return Err(BotError::Parse(MSG_USAGE.into())),
        },
        [first, rest @ ..] if looks_like_date(first) => match rest {
            [time] => (Some(*first), Some(*time), None),
            [time, password, ..] => (Some(*first), Some(*time), Some(*password)),
            [] => return Err(BotError::Parse(MSG_USAGE.into())),
        },
        [time] => (None, Some(*time), None),
        [time, password, ..] => (None, Some(*time), Some(*password)),
    };

    let start = match time_str {
        None => now,
        Some(time_str) => {
            let time = parse_time_of_day(time_str)?;
            match date_str {
                Some(date_str) => {
                    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                        .map_err(|_| BotError::Parse(MSG_INVALID_DATE.into()))?;
                    if date.year() > now.year() + 1 {
                        return Err(BotError::Parse(MSG_DATE_TOO_FAR.into()));
                    }
                    local_datetime(date, time)?
                }
                None => {
                    let today = local_datetime(now.date_naive(), time)?;
                    if today < now {
                        let tomorrow = now
                            .date_naive()
                            .checked_add_days(Days::new(1))
                            .ok_or_else(|| BotError::Parse(MSG_INVALID_DATE.into()))?;
                        local_datetime(tomorrow, time)?
                    } else {
                        today
                    }
                }
            }
        }
    };

    Ok(ReserveRequest {
        start,
        end: start + Duration::hours(RESERVATION_HOURS),
        password: password.unwrap_or(DEFAULT_PASSWORD).to_string(),
        custom_password: password.is_some(),
        starts_now: time_str.is_none(),
    })
}

/// `20:00` and `20h00` are equivalent.
fn parse_time_of_day(s: &str) -> Result<NaiveTime, BotError> {
    NaiveTime::parse_from_str(&s.replace(':', "h"), "%Hh%M")
        .map_err(|_| BotError::Parse(MSG_INVALID_TIME.into()))
}

fn local_datetime(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Tz>, BotError> {
    TIMEZONE
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| BotError::Parse(MSG_INVALID_TIME.into()))
}

fn looks_like_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}
