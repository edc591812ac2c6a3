//! Synchronized time bookkeeping.
//!
//! The monotonic clock is a free-running `u32` millisecond counter that wraps
//! every ~49.7 days. All "time since" computations go through
//! [`elapsed_since`], which subtracts modulo 2^32 and reinterprets the result
//! as a signed `i32`: a wrapped counter still yields the small positive delta,
//! and a reading that lies slightly in the future yields zero.

/// Seconds between 1900-01-01 (NTP era 0) and 1970-01-01 (UNIX epoch),
/// see <https://www.rfc-editor.org/rfc/rfc5905>
pub const NTP_TIMESTAMP_DELTA: u32 = 2_208_988_800;
/// 2000-01-01T00:00:00Z as UNIX seconds, lower bound of a plausible time
pub const MIN_PLAUSIBLE_EPOCH: u64 = 946_684_800;
/// 2100-01-01T00:00:00Z as UNIX seconds, upper bound (exclusive) of a
/// plausible time
pub const MAX_PLAUSIBLE_EPOCH: u64 = 4_102_444_800;

const MSEC_IN_SEC: u64 = 1_000;

/// Milliseconds elapsed between two readings of a wrapping millisecond counter.
///
/// The difference is computed modulo 2^32 and interpreted as `i32`; a negative
/// result (`then` lies after `now`) is clamped to zero. Deltas of 2^31 ms
/// (~24.8 days) or more are therefore not representable.
///
/// ```
/// use ntpoll::elapsed_since;
///
/// assert_eq!(elapsed_since(0x10, 0xFFFF_FFF0), 0x20);
/// assert_eq!(elapsed_since(100, 150), 0);
/// ```
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
#[must_use]
pub fn elapsed_since(now: u32, then: u32) -> u32 {
    let delta = now.wrapping_sub(then) as i32;

    if delta < 0 {
        0
    } else {
        delta as u32
    }
}

/// Returns `true` once at least `interval` milliseconds passed since `since`
#[must_use]
pub fn has_elapsed(now: u32, since: u32, interval: u32) -> bool {
    elapsed_since(now, since) >= interval
}

/// Time received in the last accepted NTP response together with the local
/// clock reading taken when it was accepted
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    seconds_since_1900: u32,
    sub_second_ms: u32,
    local_clock_at_sync: u32,
}

impl SyncRecord {
    /// Create a record. `sub_second_ms` above 999 is clamped to 999
    #[must_use]
    pub fn new(
        seconds_since_1900: u32,
        sub_second_ms: u32,
        local_clock_at_sync: u32,
    ) -> Self {
        SyncRecord {
            seconds_since_1900,
            sub_second_ms: sub_second_ms.min(999),
            local_clock_at_sync,
        }
    }

    /// NTP seconds (since 1900-01-01) reported by the server
    #[must_use]
    pub fn seconds_since_1900(&self) -> u32 {
        self.seconds_since_1900
    }

    /// Sub-second part of the server time in milliseconds. Best effort: the
    /// server's accuracy is only assumed down to whole seconds
    #[must_use]
    pub fn sub_second_ms(&self) -> u32 {
        self.sub_second_ms
    }

    /// Local monotonic clock reading at the moment the response was accepted
    #[must_use]
    pub fn local_clock_at_sync(&self) -> u32 {
        self.local_clock_at_sync
    }

    /// Network time at sync as milliseconds since 1900-01-01
    #[must_use]
    pub fn synced_ms(&self) -> u64 {
        u64::from(self.seconds_since_1900) * MSEC_IN_SEC
            + u64::from(self.sub_second_ms)
    }

    /// Estimated current UNIX time in milliseconds at local clock reading
    /// `now`.
    ///
    /// Returns `None` when the estimate falls outside of
    /// `[2000-01-01, 2100-01-01)`, which only happens with a corrupt record.
    #[must_use]
    pub fn unix_millis_at(&self, now: u32) -> Option<u64> {
        let elapsed = elapsed_since(now, self.local_clock_at_sync);
        let current_ms = self.synced_ms() + u64::from(elapsed);
        let unix_ms = current_ms
            .checked_sub(u64::from(NTP_TIMESTAMP_DELTA) * MSEC_IN_SEC)?;
        let unix_seconds = unix_ms / MSEC_IN_SEC;

        if (MIN_PLAUSIBLE_EPOCH..MAX_PLAUSIBLE_EPOCH).contains(&unix_seconds) {
            Some(unix_ms)
        } else {
            None
        }
    }

    /// Estimated current UNIX time in seconds at local clock reading `now`,
    /// see [`SyncRecord::unix_millis_at`]
    #[must_use]
    pub fn epoch_at(&self, now: u32) -> Option<u64> {
        self.unix_millis_at(now).map(|ms| ms / MSEC_IN_SEC)
    }
}
