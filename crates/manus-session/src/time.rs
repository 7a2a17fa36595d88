//! Relative-time formatting and the clock that keeps it fresh

use crate::locale::Catalog;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How often relative times are recomputed
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Current time in epoch seconds
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Describe how long ago `timestamp` was, relative to `now` (both epoch seconds)
///
/// Units are not pluralized: one hour reads "1 hours ago".
pub fn format_relative_time(timestamp: i64, now: i64, catalog: &Catalog) -> String {
    let diff_sec = now.saturating_sub(timestamp);
    let diff_min = diff_sec.div_euclid(60);
    let diff_hour = diff_min.div_euclid(60);
    let diff_day = diff_hour.div_euclid(24);
    let diff_month = diff_day.div_euclid(30);
    let diff_year = diff_month.div_euclid(12);

    if diff_sec < 60 {
        catalog.t("Just now").to_string()
    } else if diff_min < 60 {
        format!("{} {}", diff_min, catalog.t("minutes ago"))
    } else if diff_hour < 24 {
        format!("{} {}", diff_hour, catalog.t("hours ago"))
    } else if diff_day < 30 {
        format!("{} {}", diff_day, catalog.t("days ago"))
    } else if diff_month < 12 {
        format!("{} {}", diff_month, catalog.t("months ago"))
    } else {
        format!("{} {}", diff_year, catalog.t("years ago"))
    }
}

/// Publishes "now" on a fixed interval so relative times can be redrawn
///
/// The ticker task stops when the clock is dropped.
pub struct RelativeClock {
    receiver: watch::Receiver<i64>,
    task: JoinHandle<()>,
}

impl RelativeClock {
    /// Start a clock refreshing every [`REFRESH_INTERVAL`]
    pub fn start() -> Self {
        Self::with_interval(REFRESH_INTERVAL)
    }

    /// Start a clock with a custom refresh period
    pub fn with_interval(period: Duration) -> Self {
        let (sender, receiver) = watch::channel(now_secs());
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if sender.send(now_secs()).is_err() {
                    break;
                }
            }
        });
        Self { receiver, task }
    }

    /// Last published time
    pub fn now(&self) -> i64 {
        *self.receiver.borrow()
    }

    /// A receiver that is notified on every refresh
    pub fn subscribe(&self) -> watch::Receiver<i64> {
        self.receiver.clone()
    }

    /// Format a timestamp against the last published time
    pub fn format(&self, timestamp: i64, catalog: &Catalog) -> String {
        format_relative_time(timestamp, self.now(), catalog)
    }
}

impl Drop for RelativeClock {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    const NOW: i64 = 1_700_000_000;

    fn en() -> Catalog {
        Catalog::new(Locale::En)
    }

    #[test]
    fn test_just_now() {
        assert_eq!(format_relative_time(NOW - 30, NOW, &en()), "Just now");
        assert_eq!(format_relative_time(NOW, NOW, &en()), "Just now");
        assert_eq!(format_relative_time(NOW - 59, NOW, &en()), "Just now");
    }

    #[test]
    fn test_hours_literal_plural() {
        assert_eq!(format_relative_time(NOW - 3600, NOW, &en()), "1 hours ago");
    }

    #[test]
    fn test_unit_boundaries() {
        assert_eq!(format_relative_time(NOW - 60, NOW, &en()), "1 minutes ago");
        assert_eq!(format_relative_time(NOW - 3599, NOW, &en()), "59 minutes ago");
        assert_eq!(format_relative_time(NOW - 86_400, NOW, &en()), "1 days ago");
        assert_eq!(format_relative_time(NOW - 30 * 86_400, NOW, &en()), "1 months ago");
        assert_eq!(format_relative_time(NOW - 360 * 86_400, NOW, &en()), "1 years ago");
    }

    #[test]
    fn test_future_timestamp_is_just_now() {
        assert_eq!(format_relative_time(NOW + 500, NOW, &en()), "Just now");
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        assert_eq!(
            format_relative_time(i64::MIN, NOW, &en()),
            format!("{} years ago", i64::MAX / 60 / 60 / 24 / 30 / 12)
        );
        assert_eq!(format_relative_time(i64::MAX, NOW, &en()), "Just now");
    }

    #[test]
    fn test_localized() {
        let zh = Catalog::new(Locale::Zh);
        assert_eq!(format_relative_time(NOW - 30, NOW, &zh), "刚刚");
        assert_eq!(format_relative_time(NOW - 7200, NOW, &zh), "2 小时前");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_refreshes_on_interval() {
        let clock = RelativeClock::with_interval(Duration::from_secs(60));
        let mut updates = clock.subscribe();

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .expect("clock should publish within the interval")
            .unwrap();
        assert!(clock.now() > 0);
    }
}
