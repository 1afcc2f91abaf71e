//! Closed date windows used to scope aggregations.

use serde::{Deserialize, Serialize};
use time::{Date, Month, OffsetDateTime, Time, UtcOffset};

use crate::Error;

/// A closed interval of instants. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    start: OffsetDateTime,
    end: OffsetDateTime,
}

impl DateWindow {
    /// Create a window from `start` to `end` inclusive.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidWindow] if `end` is before `start`.
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self, Error> {
        if end < start {
            return Err(Error::InvalidWindow);
        }

        Ok(Self { start, end })
    }

    /// The calendar month containing `instant`, as seen from `offset`.
    ///
    /// The window runs from midnight on the first of the month to the last
    /// representable instant of the month's final day.
    pub fn month_containing(instant: OffsetDateTime, offset: UtcOffset) -> Self {
        let local = instant.to_offset(offset);
        let (year, month) = (local.year(), local.month());

        let first = date_unchecked(year, month, 1);
        let last = date_unchecked(year, month, last_day_of_month(year, month));

        Self {
            start: first.midnight().assume_offset(offset),
            end: last.with_time(Time::MAX).assume_offset(offset),
        }
    }

    /// The first instant in the window.
    pub fn start(&self) -> OffsetDateTime {
        self.start
    }

    /// The last instant in the window.
    pub fn end(&self) -> OffsetDateTime {
        self.end
    }

    /// Whether `instant` falls within the window, ends included.
    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Test `instant` against an optional window, where `None` means all time.
pub fn in_window(window: Option<&DateWindow>, instant: OffsetDateTime) -> bool {
    window.is_none_or(|window| window.contains(instant))
}

fn date_unchecked(year: i32, month: Month, day: u8) -> Date {
    // Day numbers come from `last_day_of_month`, so the date always exists.
    Date::from_calendar_date(year, month, day).unwrap_or(Date::MIN)
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use time::{
        Duration,
        macros::{datetime, offset},
    };

    use super::{DateWindow, in_window};
    use crate::Error;

    #[test]
    fn new_rejects_reversed_window() {
        let result = DateWindow::new(
            datetime!(2024-02-01 00:00 UTC),
            datetime!(2024-01-01 00:00 UTC),
        );

        assert_eq!(result, Err(Error::InvalidWindow));
    }

    #[test]
    fn contains_includes_both_ends() {
        let start = datetime!(2024-01-01 00:00 UTC);
        let end = datetime!(2024-01-31 00:00 UTC);
        let window = DateWindow::new(start, end).unwrap();

        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(start - Duration::milliseconds(1)));
        assert!(!window.contains(end + Duration::milliseconds(1)));
    }

    #[test]
    fn single_instant_window_contains_only_that_instant() {
        let instant = datetime!(2024-06-15 12:00 UTC);
        let window = DateWindow::new(instant, instant).unwrap();

        assert!(window.contains(instant));
        assert!(!window.contains(instant + Duration::nanoseconds(1)));
    }

    #[test]
    fn no_window_means_all_time() {
        assert!(in_window(None, datetime!(1970-01-01 00:00 UTC)));
    }

    #[test]
    fn month_containing_covers_leap_february() {
        let window = DateWindow::month_containing(datetime!(2024-02-10 08:00 UTC), offset!(UTC));

        assert_eq!(window.start(), datetime!(2024-02-01 00:00 UTC));
        assert!(window.contains(datetime!(2024-02-29 23:59:59.999 UTC)));
        assert!(!window.contains(datetime!(2024-03-01 00:00 UTC)));
    }

    #[test]
    fn month_containing_uses_local_calendar() {
        // 2024-01-31 20:00 UTC is already February in Auckland (+13:00).
        let window =
            DateWindow::month_containing(datetime!(2024-01-31 20:00 UTC), offset!(+13:00));

        assert_eq!(window.start(), datetime!(2024-02-01 00:00 +13:00));
        assert!(window.contains(datetime!(2024-01-31 20:00 UTC)));
        assert!(!window.contains(datetime!(2024-01-31 10:00 UTC)));
    }
}
