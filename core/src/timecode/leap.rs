//! Leap second announcement and execution windows
//!
//! A planned leap second happens at the end of a UTC month, which is
//! 08:59:60 JST on the 1st of the following month. The warning runs from
//! 09:00 JST on the 2nd of the planned month until 09:00 JST on that 1st.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::{EncodingOptions, LeapSecondKind, LeapSecondPlan};

use super::context::jst;

/// Leap second flags in force for one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeapSecondState {
    /// Announcement bit (second 53)
    pub warning: bool,
    /// Direction bit source (second 54 is set for inserts)
    pub direction: LeapSecondKind,
    /// This minute gains a second
    pub insert: bool,
    /// This minute loses a second
    pub delete: bool,
}

impl Default for LeapSecondState {
    fn default() -> Self {
        Self {
            warning: false,
            direction: LeapSecondKind::Insert,
            insert: false,
            delete: false,
        }
    }
}

impl LeapSecondState {
    /// Resolve from whichever source `options` selects
    ///
    /// A configured plan wins; otherwise the manual flags apply as if the
    /// execution minute were now.
    pub fn resolve(instant: DateTime<Utc>, options: &EncodingOptions) -> Self {
        match options.leap_second_plan {
            Some(plan) => Self::from_plan(instant, &plan),
            None => Self::from_manual(options.leap_second_pending, options.leap_second_inserted),
        }
    }

    pub fn from_manual(pending: bool, inserted: bool) -> Self {
        Self {
            warning: pending,
            direction: if inserted {
                LeapSecondKind::Insert
            } else {
                LeapSecondKind::Delete
            },
            insert: pending && inserted,
            delete: pending && !inserted,
        }
    }

    /// Flags for `instant` under a calendar plan
    ///
    /// Plans naming an impossible month resolve to no leap second.
    pub fn from_plan(instant: DateTime<Utc>, plan: &LeapSecondPlan) -> Self {
        let Some(windows) = PlanWindows::new(plan) else {
            return Self::default();
        };
        let local = instant.with_timezone(&jst()).naive_local();

        let warning = windows.warning_start <= local && local < windows.warning_end;
        let executing = windows.execution_start <= local && local < windows.warning_end;

        Self {
            warning,
            direction: plan.kind,
            insert: executing && plan.kind == LeapSecondKind::Insert,
            delete: executing && plan.kind == LeapSecondKind::Delete,
        }
    }

    /// True when the frame length changes this minute
    pub fn is_executing(&self) -> bool {
        self.insert || self.delete
    }
}

/// JST wall times bounding a plan
struct PlanWindows {
    warning_start: NaiveDateTime,
    execution_start: NaiveDateTime,
    warning_end: NaiveDateTime,
}

impl PlanWindows {
    fn new(plan: &LeapSecondPlan) -> Option<Self> {
        let (next_year, next_month) = if plan.month_utc == 12 {
            (plan.year_utc.checked_add(1)?, 1)
        } else {
            (plan.year_utc, plan.month_utc.checked_add(1)?)
        };

        let warning_start = NaiveDate::from_ymd_opt(plan.year_utc, plan.month_utc, 2)?
            .and_hms_opt(9, 0, 0)?;
        let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;

        Some(Self {
            warning_start,
            execution_start: first_of_next.and_hms_opt(8, 59, 0)?,
            warning_end: first_of_next.and_hms_opt(9, 0, 0)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jst_instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        jst()
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .unwrap()
            .with_timezone(&Utc)
    }

    const PLAN: LeapSecondPlan = LeapSecondPlan {
        year_utc: 2016,
        month_utc: 12,
        kind: LeapSecondKind::Insert,
    };

    #[test]
    fn test_warning_window_bounds() {
        let before = LeapSecondState::from_plan(jst_instant(2016, 12, 2, 8, 59, 59), &PLAN);
        assert!(!before.warning);

        let start = LeapSecondState::from_plan(jst_instant(2016, 12, 2, 9, 0, 0), &PLAN);
        assert!(start.warning);
        assert!(!start.is_executing());

        let after = LeapSecondState::from_plan(jst_instant(2017, 1, 1, 9, 0, 0), &PLAN);
        assert!(!after.warning);
    }

    #[test]
    fn test_execution_minute_rolls_into_next_year() {
        let exec = LeapSecondState::from_plan(jst_instant(2017, 1, 1, 8, 59, 30), &PLAN);
        assert!(exec.warning);
        assert!(exec.insert);
        assert!(!exec.delete);

        let minute_before = LeapSecondState::from_plan(jst_instant(2017, 1, 1, 8, 58, 59), &PLAN);
        assert!(minute_before.warning);
        assert!(!minute_before.is_executing());
    }

    #[test]
    fn test_delete_plan_direction() {
        let plan = LeapSecondPlan {
            year_utc: 2030,
            month_utc: 6,
            kind: LeapSecondKind::Delete,
        };
        let exec = LeapSecondState::from_plan(jst_instant(2030, 7, 1, 8, 59, 0), &plan);
        assert!(exec.delete);
        assert_eq!(exec.direction, LeapSecondKind::Delete);
    }

    #[test]
    fn test_impossible_plan_is_inert() {
        let plan = LeapSecondPlan {
            year_utc: 2030,
            month_utc: 13,
            kind: LeapSecondKind::Insert,
        };
        let state = LeapSecondState::from_plan(jst_instant(2030, 7, 1, 8, 59, 0), &plan);
        assert_eq!(state, LeapSecondState::default());
    }

    #[test]
    fn test_plan_overrides_manual_flags() {
        let options = EncodingOptions {
            leap_second_pending: true,
            leap_second_inserted: true,
            leap_second_plan: Some(PLAN),
            ..EncodingOptions::default()
        };
        let state = LeapSecondState::resolve(jst_instant(2016, 6, 15, 12, 0, 0), &options);
        assert!(!state.warning);
        assert!(!state.is_executing());
    }

    #[test]
    fn test_manual_flags() {
        let insert = LeapSecondState::from_manual(true, true);
        assert!(insert.warning && insert.insert && !insert.delete);

        let delete = LeapSecondState::from_manual(true, false);
        assert!(delete.warning && delete.delete && !delete.insert);

        let idle = LeapSecondState::from_manual(false, true);
        assert!(!idle.warning && !idle.is_executing());
    }
}
