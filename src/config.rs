//! Runtime settings shared by the library and the binaries.

use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::{Error, pocket::PocketMoneySettings};

/// How the repository talks to its document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    /// How long a live subscription waits before retrying after the store
    /// could not be read. A change notification cuts the wait short.
    pub retry_interval: Duration,
    /// How often a SQLite store checks for commits made by other processes.
    pub poll_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What the dashboard needs besides the stored data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardConfig {
    /// The offset used to decide where the current month starts and ends.
    pub offset: UtcOffset,
    /// Income and savings goal. Pocket money is only worked out when set.
    pub pocket_money: Option<PocketMoneySettings>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            offset: UtcOffset::UTC,
            pocket_money: None,
        }
    }
}

/// Get the current UTC offset of a canonical timezone name such as
/// "Pacific/Auckland".
///
/// # Errors
///
/// Returns [Error::InvalidTimezone] if the name is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
}
