use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};

/// A fixed weekly run time in UTC.
///
/// The default is Sunday 02:00, the cron expression `0 2 * * 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    time: NaiveTime,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, time: NaiveTime) -> Self {
        Self { weekday, time }
    }

    /// First run time strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let days_ahead = (7 + self.weekday.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64)
            % 7;
        let candidate = (now.date_naive() + Duration::days(days_ahead))
            .and_time(self.time)
            .and_utc();

        if candidate > now {
            candidate
        } else {
            candidate + Duration::weeks(1)
        }
    }

    /// How long to sleep from `now` until the next run.
    pub fn until_next(&self, now: DateTime<Utc>) -> std::time::Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self::new(
            Weekday::Sun,
            NaiveTime::from_hms_opt(2, 0, 0).expect("02:00:00 is a valid time of day"),
        )
    }
}
