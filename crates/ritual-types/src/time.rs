use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Timelike, Utc};
use thiserror::Error;

/// Offset assumed for users who never confirmed their timezone.
pub const DEFAULT_UTC_OFFSET: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected a 24-hour time like 08:30")]
pub struct InvalidTime;

/// A wall-clock minute in a user's local day. Seconds are never tracked:
/// reminders fire on minute boundaries only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReminderTime {
    hour: u8,
    minute: u8,
}

impl ReminderTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidTime> {
        if hour > 23 || minute > 59 {
            return Err(InvalidTime);
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl FromStr for ReminderTime {
    type Err = InvalidTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s.trim().split_once(':').ok_or(InvalidTime)?;
        let hour: u8 = h.trim().parse().map_err(|_| InvalidTime)?;
        let minute: u8 = m.trim().parse().map_err(|_| InvalidTime)?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for ReminderTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The wall-clock minute a user with the given fixed offset is currently
/// living through.
pub fn local_wall_time(now_utc: DateTime<Utc>, offset_hours: i32) -> ReminderTime {
    let local = now_utc + Duration::hours(i64::from(offset_hours));
    ReminderTime {
        hour: local.hour() as u8,
        minute: local.minute() as u8,
    }
}

/// Derives a whole-hour UTC offset from the local time a user reports.
///
/// The reported time is anchored to today's UTC date, the distance to the
/// actual UTC moment is rounded to the nearest hour, and the result can
/// exceed +/-12 when the user's local date differs from the UTC date.
pub fn resolve_utc_offset(
    reported: ReminderTime,
    now_utc: DateTime<Utc>,
) -> Result<i32, InvalidTime> {
    let claimed = now_utc
        .date_naive()
        .and_hms_opt(u32::from(reported.hour), u32::from(reported.minute), 0)
        .ok_or(InvalidTime)?;
    let diff_seconds = (claimed - now_utc.naive_utc()).num_seconds();
    Ok((diff_seconds as f64 / 3600.0).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, h, m, s).unwrap()
    }

    #[test]
    fn parses_zero_padded_and_bare_hours() {
        assert_eq!("08:30".parse::<ReminderTime>().unwrap(), ReminderTime::new(8, 30).unwrap());
        assert_eq!("8:05".parse::<ReminderTime>().unwrap(), ReminderTime::new(8, 5).unwrap());
        assert_eq!(" 23:59 ".parse::<ReminderTime>().unwrap(), ReminderTime::new(23, 59).unwrap());
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        assert!("24:00".parse::<ReminderTime>().is_err());
        assert!("12:60".parse::<ReminderTime>().is_err());
        assert!("noon".parse::<ReminderTime>().is_err());
        assert!("12".parse::<ReminderTime>().is_err());
        assert!("".parse::<ReminderTime>().is_err());
        assert!("-1:30".parse::<ReminderTime>().is_err());
    }

    #[test]
    fn displays_zero_padded() {
        assert_eq!(ReminderTime::new(8, 5).unwrap().to_string(), "08:05");
        assert_eq!(ReminderTime::new(23, 0).unwrap().to_string(), "23:00");
    }

    #[test]
    fn local_wall_time_applies_offset() {
        assert_eq!(local_wall_time(utc(3, 0, 0), 5), ReminderTime::new(8, 0).unwrap());
        assert_eq!(local_wall_time(utc(3, 0, 0), 0), ReminderTime::new(3, 0).unwrap());
        assert_eq!(local_wall_time(utc(3, 0, 0), -4), ReminderTime::new(23, 0).unwrap());
    }

    #[test]
    fn local_wall_time_wraps_past_midnight() {
        assert_eq!(local_wall_time(utc(20, 30, 0), 5), ReminderTime::new(1, 30).unwrap());
    }

    #[test]
    fn offset_from_reported_local_time() {
        // User says 14:30 while UTC reads 09:30.
        let got = resolve_utc_offset(ReminderTime::new(14, 30).unwrap(), utc(9, 30, 0)).unwrap();
        assert_eq!(got, 5);
    }

    #[test]
    fn offset_rounds_to_nearest_hour() {
        // 4h29m ahead rounds down, 4h31m ahead rounds up.
        let base = utc(9, 30, 0);
        assert_eq!(resolve_utc_offset(ReminderTime::new(13, 59).unwrap(), base).unwrap(), 4);
        assert_eq!(resolve_utc_offset(ReminderTime::new(14, 1).unwrap(), base).unwrap(), 5);
    }

    #[test]
    fn offset_negative_when_behind_utc() {
        let got = resolve_utc_offset(ReminderTime::new(4, 30).unwrap(), utc(9, 30, 0)).unwrap();
        assert_eq!(got, -5);
    }

    #[test]
    fn offset_is_idempotent_through_local_wall_time() {
        let now = utc(9, 30, 0);
        let offset = resolve_utc_offset(ReminderTime::new(14, 30).unwrap(), now).unwrap();
        assert_eq!(local_wall_time(now, offset), ReminderTime::new(14, 30).unwrap());
    }

    #[test]
    fn offset_can_exceed_twelve_across_date_line() {
        // 23:59 local reported one minute after UTC midnight: both anchored
        // to the same UTC date, so the distance reads as almost a full day.
        let got = resolve_utc_offset(ReminderTime::new(23, 59).unwrap(), utc(0, 1, 0)).unwrap();
        assert_eq!(got, 24);
    }
}
