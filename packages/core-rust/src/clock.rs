//! Wall-clock and calendar source for record timestamps and expiry windows.
//!
//! Record stamps (`createdAt`/`updatedAt`) need an instant; expiry windows need
//! the *local calendar date*. Both come from a [`ClockSource`] so tests can pin
//! "today" to a fixed date.

use std::sync::atomic::{AtomicI64, Ordering};

use time::{Date, Duration, OffsetDateTime, UtcOffset};

/// Abstraction over the system clock for dependency injection.
///
/// The default implementation ([`SystemClock`]) reads the real system time in
/// a fixed UTC offset captured at startup.
pub trait ClockSource: Send + Sync {
    /// Returns the current instant, expressed in the clock's offset.
    fn now(&self) -> OffsetDateTime;

    /// Returns the current calendar date in the clock's offset.
    ///
    /// Day granularity only: two calls on the same local day compare equal
    /// regardless of time of day.
    fn today(&self) -> Date {
        self.now().date()
    }
}

/// Clock backed by the real system time.
///
/// The local UTC offset cannot be queried reliably once a multi-threaded
/// runtime is running, so it is captured once (see [`SystemClock::with_offset`])
/// before the runtime starts.
///
/// The offset stays fixed for the life of the clock. After a daylight-saving
/// change, `today()` can differ from the wall-clock date for up to an hour
/// around midnight until the process restarts.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    /// Creates a clock that reports times in the given offset.
    #[must_use]
    pub fn with_offset(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Creates a clock in UTC.
    #[must_use]
    pub fn utc() -> Self {
        Self::with_offset(UtcOffset::UTC)
    }

    /// Offset this clock reports in.
    #[must_use]
    pub fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Manually driven clock for deterministic tests and replays.
///
/// Holds whole seconds since the Unix epoch (UTC). [`FixedClock::advance`]
/// moves it forward so successive mutations get distinct stamps.
#[derive(Debug)]
pub struct FixedClock {
    unix_seconds: AtomicI64,
}

impl FixedClock {
    /// Creates a clock frozen at `at`.
    #[must_use]
    pub fn new(at: OffsetDateTime) -> Self {
        Self {
            unix_seconds: AtomicI64::new(at.unix_timestamp()),
        }
    }

    /// Creates a clock frozen at noon UTC on `date`.
    #[must_use]
    pub fn on_date(date: Date) -> Self {
        Self::new(date.midnight().assume_utc() + Duration::hours(12))
    }

    /// Moves the clock forward by `by` (whole seconds).
    pub fn advance(&self, by: Duration) {
        self.unix_seconds.fetch_add(by.whole_seconds(), Ordering::SeqCst);
    }
}

impl ClockSource for FixedClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(self.unix_seconds.load(Ordering::SeqCst))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}
