//! Calendar fields in Japan Standard Time

use chrono::{DateTime, Datelike, FixedOffset, Offset, Timelike, Utc};

/// JST is UTC+9 all year
pub const JST_OFFSET_SECONDS: i32 = 9 * 3600;

/// The fixed civil time zone every frame is encoded in
pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Start of the JST minute containing `instant`
pub fn jst_minute_start(instant: DateTime<Utc>) -> DateTime<FixedOffset> {
    let local = instant.with_timezone(&jst());
    local
        .with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(local)
}

/// Calendar fields of one instant as seen in JST
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFrameContext {
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 1-31
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: u32,
    /// 1-366
    pub day_of_year: u32,
}

impl TimeFrameContext {
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&jst());
        Self {
            year: local.year(),
            month: local.month(),
            day: local.day(),
            hour: local.hour(),
            minute: local.minute(),
            second: local.second(),
            weekday: local.weekday().num_days_from_sunday(),
            day_of_year: local.ordinal(),
        }
    }

    /// Last two digits of the year, never negative
    pub fn year_of_century(&self) -> u32 {
        self.year.rem_euclid(100) as u32
    }
}
