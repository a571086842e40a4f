use super::{FilterError, FilterOptions};
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Effective half-open time interval `[start, end)`. Either bound may be
/// absent, leaving that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl TimeWindow {
    /// A window that contains every timestamp.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Resolve the requested time options into one window, highest
    /// precedence first:
    ///
    /// 1. A relative span (`last_minutes`/`last_hours`, additive when both
    ///    are given) ending at `now`.
    /// 2. `today`: midnight of `now`'s calendar day up to `now`.
    /// 3. The absolute bounds, either side optional.
    ///
    /// With none of them the window is unbounded. A resolved start after the
    /// resolved end is a configuration error.
    pub fn resolve(options: &FilterOptions, now: NaiveDateTime) -> Result<TimeWindow, FilterError> {
        if options.has_relative_span() {
            let minutes = options.last_minutes.unwrap_or(0);
            let hours = options.last_hours.unwrap_or(0);
            if minutes == 0 && hours == 0 {
                return Err(FilterError::EmptySpan);
            }
            // Checked all the way down: a span that overflows the minute
            // arithmetic or pushes the start outside the representable
            // date range is a configuration error, never a wrap or panic.
            let start = hours
                .checked_mul(60)
                .and_then(|h| h.checked_add(minutes))
                .and_then(|total| i64::try_from(total).ok())
                .and_then(Duration::try_minutes)
                .and_then(|span| now.checked_sub_signed(span))
                .ok_or(FilterError::SpanOutOfRange)?;
            return Ok(TimeWindow {
                start: Some(start),
                end: Some(now),
            });
        }

        if options.today {
            return Ok(TimeWindow {
                start: Some(now.date().and_time(NaiveTime::MIN)),
                end: Some(now),
            });
        }

        let window = TimeWindow {
            start: options.start_time,
            end: options.end_time,
        };
        if let (Some(start), Some(end)) = (window.start, window.end)
            && start > end
        {
            return Err(FilterError::StartAfterEnd { start, end });
        }
        Ok(window)
    }

    /// Half-open containment test: `start <= timestamp < end`.
    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        let after_start = self.start.map(|start| timestamp >= start).unwrap_or(true);
        let before_end = self.end.map(|end| timestamp < end).unwrap_or(true);
        after_start && before_end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_no_options_is_unbounded() {
        let window = TimeWindow::resolve(&FilterOptions::new(), at("2025-04-20 12:00:00")).unwrap();
        assert!(window.is_unbounded());
        assert!(window.contains(at("1999-01-01 00:00:00")));
        assert!(window.contains(at("2099-01-01 00:00:00")));
    }

    #[test]
    fn test_last_minutes_window() {
        let now = at("2025-04-20 12:00:00");
        let options = FilterOptions::new().with_last_minutes(Some(30));
        let window = TimeWindow::resolve(&options, now).unwrap();

        assert_eq!(window.start, Some(at("2025-04-20 11:30:00")));
        assert_eq!(window.end, Some(now));
        assert!(window.contains(at("2025-04-20 11:31:00")));
        assert!(!window.contains(at("2025-04-20 11:29:00")));
    }

    #[test]
    fn test_minutes_and_hours_are_additive() {
        let now = at("2025-04-20 12:00:00");
        let options = FilterOptions::new()
            .with_last_minutes(Some(90))
            .with_last_hours(Some(1));
        let window = TimeWindow::resolve(&options, now).unwrap();
        assert_eq!(window.start, Some(at("2025-04-20 09:30:00")));
    }

    #[test]
    fn test_oversized_relative_span_is_rejected() {
        let now = at("2025-04-20 12:00:00");

        // Beyond i64 minutes entirely.
        let options = FilterOptions::new().with_last_minutes(Some(u64::MAX));
        let err = TimeWindow::resolve(&options, now).unwrap_err();
        assert!(matches!(err, FilterError::SpanOutOfRange));

        // Representable as i64 minutes but overflows the duration type.
        let options = FilterOptions::new().with_last_minutes(Some(i64::MAX as u64));
        let err = TimeWindow::resolve(&options, now).unwrap_err();
        assert!(matches!(err, FilterError::SpanOutOfRange));

        // Valid duration whose subtraction leaves the representable
        // date range.
        let options = FilterOptions::new().with_last_hours(Some(3_000_000_000));
        let err = TimeWindow::resolve(&options, now).unwrap_err();
        assert!(matches!(err, FilterError::SpanOutOfRange));

        // The hours-to-minutes conversion itself must not wrap either.
        let options = FilterOptions::new().with_last_hours(Some(u64::MAX / 2));
        let err = TimeWindow::resolve(&options, now).unwrap_err();
        assert!(matches!(err, FilterError::SpanOutOfRange));
    }

    #[test]
    fn test_today_starts_at_midnight() {
        let now = at("2025-04-20 12:34:56");
        let options = FilterOptions::new().with_today(true);
        let window = TimeWindow::resolve(&options, now).unwrap();

        assert_eq!(window.start, Some(at("2025-04-20 00:00:00")));
        assert_eq!(window.end, Some(now));
        assert!(window.contains(at("2025-04-20 00:00:00")));
        assert!(!window.contains(at("2025-04-19 23:59:59")));
    }

    #[test]
    fn test_relative_overrides_today_and_absolute() {
        let now = at("2025-04-20 12:00:00");
        let options = FilterOptions::new()
            .with_last_hours(Some(1))
            .with_today(true)
            .with_time_bounds(Some(at("2020-01-01 00:00:00")), Some(at("2020-01-02 00:00:00")));
        let window = TimeWindow::resolve(&options, now).unwrap();
        assert_eq!(window.start, Some(at("2025-04-20 11:00:00")));
        assert_eq!(window.end, Some(now));
    }

    #[test]
    fn test_today_overrides_absolute() {
        let now = at("2025-04-20 12:00:00");
        let options = FilterOptions::new()
            .with_today(true)
            .with_time_bounds(Some(at("2020-01-01 00:00:00")), None);
        let window = TimeWindow::resolve(&options, now).unwrap();
        assert_eq!(window.start, Some(at("2025-04-20 00:00:00")));
    }

    #[test]
    fn test_absolute_bounds_used_verbatim() {
        let now = at("2025-04-20 12:00:00");
        let start = at("2025-04-01 00:00:00");
        let end = at("2025-04-10 00:00:00");
        let options = FilterOptions::new().with_time_bounds(Some(start), Some(end));
        let window = TimeWindow::resolve(&options, now).unwrap();

        assert_eq!(window.start, Some(start));
        assert_eq!(window.end, Some(end));
    }

    #[test]
    fn test_half_open_bounds() {
        let start = at("2025-04-01 00:00:00");
        let end = at("2025-04-10 00:00:00");
        let window = TimeWindow {
            start: Some(start),
            end: Some(end),
        };

        assert!(window.contains(start), "start is included");
        assert!(!window.contains(end), "end is excluded");
        assert!(window.contains(at("2025-04-09 23:59:59")));
    }

    #[test]
    fn test_open_sides() {
        let only_start = TimeWindow {
            start: Some(at("2025-04-01 00:00:00")),
            end: None,
        };
        assert!(only_start.contains(at("2099-01-01 00:00:00")));
        assert!(!only_start.contains(at("2025-03-31 23:59:59")));

        let only_end = TimeWindow {
            start: None,
            end: Some(at("2025-04-01 00:00:00")),
        };
        assert!(only_end.contains(at("1999-01-01 00:00:00")));
        assert!(!only_end.contains(at("2025-04-01 00:00:00")));
    }

    #[test]
    fn test_start_after_end_is_rejected() {
        let options = FilterOptions::new().with_time_bounds(
            Some(at("2025-04-10 00:00:00")),
            Some(at("2025-04-01 00:00:00")),
        );
        let err = TimeWindow::resolve(&options, at("2025-04-20 12:00:00")).unwrap_err();
        assert!(matches!(err, FilterError::StartAfterEnd { .. }));
    }

    #[test]
    fn test_equal_bounds_match_nothing() {
        let instant = at("2025-04-10 00:00:00");
        let options = FilterOptions::new().with_time_bounds(Some(instant), Some(instant));
        let window = TimeWindow::resolve(&options, at("2025-04-20 12:00:00")).unwrap();
        assert!(!window.contains(instant));
    }
}
