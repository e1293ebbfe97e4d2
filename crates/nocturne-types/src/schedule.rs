//! Nightly window rules.
//!
//! The chat runs 21:00 to 22:00 in one fixed civil timezone. Entry closes
//! at 21:45, matching at 21:50, everything at 22:00. The phase is recomputed
//! from the wall clock on every call, with no cached state, so it stays
//! correct across restarts and across multiple server instances.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Opening hour of the nightly window (local wall clock).
pub const OPEN_HOUR: u32 = 21;
/// Minute past the open hour after which new queue entries are refused.
pub const ENTRY_CUTOFF_MINUTE: u32 = 45;
/// Minute past the open hour after which no new rooms are created.
pub const MATCH_CUTOFF_MINUTE: u32 = 50;
/// Hard close hour; every live room ends here.
pub const CLOSE_HOUR: u32 = 22;

/// Admission phase derived purely from wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// 21:00:00 to 21:44:59, joining and matching both allowed.
    Open,
    /// 21:45:00 to 21:49:59, no new entries; waiting entries may still match.
    EntryClosed,
    /// 21:50:00 to 21:59:59, no new rooms; existing ones keep running.
    MatchingClosed,
    /// Everything outside the window.
    Closed,
}

/// The single civil timezone all window rules are evaluated in.
///
/// The deployment zone is a fixed UTC offset (the service targets one
/// region; the reference zone is UTC+8, which has no DST).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    offset: FixedOffset,
}

impl Schedule {
    /// Build a schedule from a whole-hour UTC offset. Returns `None` for
    /// offsets chrono cannot represent (outside ±23h).
    pub fn from_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(|offset| Self { offset })
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Map an instant to the admission phase. Pure; boundaries are
    /// closed-below/open-above, so 21:45:00 exactly is already EntryClosed
    /// and 22:00:00 exactly is Closed.
    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        let local = now.with_timezone(&self.offset);
        if local.hour() != OPEN_HOUR {
            return Phase::Closed;
        }
        match local.minute() {
            m if m < ENTRY_CUTOFF_MINUTE => Phase::Open,
            m if m < MATCH_CUTOFF_MINUTE => Phase::EntryClosed,
            _ => Phase::MatchingClosed,
        }
    }

    /// Calendar date in the zone, which keys the self-end allowance. A new
    /// date means a fresh allowance.
    pub fn night_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Time remaining until today's hard close, zero once past it.
    pub fn until_hard_close(&self, now: DateTime<Utc>) -> Duration {
        let local = now.with_timezone(&self.offset);
        let close_sec = i64::from(CLOSE_HOUR) * 3600;
        let now_sec = i64::from(local.num_seconds_from_midnight());
        if now_sec >= close_sec {
            Duration::zero()
        } else {
            Duration::seconds(close_sec - now_sec)
        }
    }

    /// Wall-clock time in the zone, formatted HH:MM:SS for status payloads.
    pub fn local_time_string(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.offset).format("%H:%M:%S").to_string()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        // UTC+8 always constructs; fall back to UTC if chrono ever refuses.
        Schedule::from_offset_hours(8).unwrap_or(Self { offset: Utc.fix() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn schedule() -> Schedule {
        Schedule::from_offset_hours(8).unwrap()
    }

    /// Build a UTC instant whose +08:00 local wall clock reads h:m:s.
    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        let local = schedule()
            .offset()
            .with_ymd_and_hms(2026, 3, 14, h, m, s)
            .unwrap();
        local.with_timezone(&Utc)
    }

    #[test]
    fn phase_boundaries() {
        let sched = schedule();
        assert_eq!(sched.phase(at(21, 0, 0)), Phase::Open);
        assert_eq!(sched.phase(at(21, 44, 59)), Phase::Open);
        assert_eq!(sched.phase(at(21, 45, 0)), Phase::EntryClosed);
        assert_eq!(sched.phase(at(21, 49, 59)), Phase::EntryClosed);
        assert_eq!(sched.phase(at(21, 50, 0)), Phase::MatchingClosed);
        assert_eq!(sched.phase(at(21, 59, 59)), Phase::MatchingClosed);
        assert_eq!(sched.phase(at(22, 0, 0)), Phase::Closed);
        assert_eq!(sched.phase(at(20, 59, 59)), Phase::Closed);
    }

    #[test]
    fn phase_well_outside_window() {
        let sched = schedule();
        assert_eq!(sched.phase(at(3, 30, 0)), Phase::Closed);
        assert_eq!(sched.phase(at(12, 0, 0)), Phase::Closed);
        assert_eq!(sched.phase(at(23, 59, 59)), Phase::Closed);
    }

    #[test]
    fn night_date_follows_the_zone_not_utc() {
        let sched = schedule();
        // 21:30 on Mar 14 in +08:00 is still Mar 14 UTC 13:30.
        let during = at(21, 30, 0);
        assert_eq!(
            sched.night_date(during),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        // 01:00 local on Mar 15 is Mar 14 17:00 UTC; the zone's date wins.
        let after_midnight = at(1, 0, 0) + Duration::days(1);
        assert_eq!(
            sched.night_date(after_midnight),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
        );
    }

    #[test]
    fn until_hard_close_counts_down_and_clamps() {
        let sched = schedule();
        assert_eq!(
            sched.until_hard_close(at(21, 55, 0)),
            Duration::seconds(5 * 60)
        );
        assert_eq!(sched.until_hard_close(at(22, 0, 0)), Duration::zero());
        assert_eq!(sched.until_hard_close(at(23, 15, 0)), Duration::zero());
        // Earlier in the day the close is still ahead.
        assert_eq!(
            sched.until_hard_close(at(20, 0, 0)),
            Duration::seconds(2 * 3600)
        );
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Phase::MatchingClosed).unwrap(),
            "\"matching_closed\""
        );
        assert_eq!(serde_json::to_string(&Phase::Open).unwrap(), "\"open\"");
    }
}
