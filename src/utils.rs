//! Calendar time helpers built on top of [`chrono`]
use chrono::{DateTime, Utc};

use crate::{MonotonicClock, NtpClient, NtpUdpSocket, SyncRecord};

impl<U, C> NtpClient<'_, U, C>
where
    U: NtpUdpSocket,
    C: MonotonicClock,
{
    /// Current network time as a UTC date and time.
    ///
    /// `None` whenever [`NtpClient::epoch_millis`] is `None`
    #[must_use]
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        unix_millis_to_date_time(self.epoch_millis()?)
    }
}

impl SyncRecord {
    /// Server time carried by the accepted response as a UTC date and time
    #[must_use]
    pub fn synced_date_time(&self) -> Option<DateTime<Utc>> {
        let millis = self.unix_millis_at(self.local_clock_at_sync())?;

        unix_millis_to_date_time(millis)
    }
}

fn unix_millis_to_date_time(millis: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(i64::try_from(millis).ok()?)
}

#[cfg(test)]
mod utils_tests {
    use super::unix_millis_to_date_time;
    use crate::{SyncRecord, NTP_TIMESTAMP_DELTA};
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_unix_millis_conversion() {
        // 2024-02-29T12:34:56.789Z
        let time = unix_millis_to_date_time(1_709_210_096_789).unwrap();

        assert_eq!((time.year(), time.month(), time.day()), (2024, 2, 29));
        assert_eq!((time.hour(), time.minute(), time.second()), (12, 34, 56));
        assert_eq!(time.timestamp_subsec_millis(), 789);
        assert!(unix_millis_to_date_time(u64::MAX).is_none());
    }

    #[test]
    fn test_synced_date_time() {
        // 2030-07-15T08:00:00Z
        let record =
            SyncRecord::new(1_910_332_800 + NTP_TIMESTAMP_DELTA, 500, 42);
        let time = record.synced_date_time().unwrap();

        assert_eq!((time.year(), time.month(), time.day()), (2030, 7, 15));
        assert_eq!(time.hour(), 8);
        assert_eq!(time.timestamp_subsec_millis(), 500);

        assert!(SyncRecord::new(0, 0, 0).synced_date_time().is_none());
    }
}
