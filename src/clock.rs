//! Clock and time-source abstractions for date-granular license checks.

use chrono::{DateTime, NaiveDate, Utc};

/// Clock trait for deterministic time in tests.
pub trait Clock: Send + Sync {
    /// Get the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current UTC calendar day. Expiry checks compare at this granularity.
    fn today(&self) -> NaiveDate {
        self.now_utc().date_naive()
    }
}

/// System clock using actual wall time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An external source of trusted time, used to detect local clock rollback.
///
/// Implementations typically query an NTP server. Returning `None` means the
/// source could not be reached; callers treat that as a failed check.
pub trait NetworkTime: Send + Sync {
    /// Current time according to the network source.
    fn network_now(&self) -> Option<DateTime<Utc>>;
}

/// Mock clock for deterministic testing.
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Clone)]
pub struct MockClock {
    now: DateTime<Utc>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockClock {
    /// Create a mock clock frozen at the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Create a mock clock from an RFC 3339 string.
    pub fn from_rfc3339(s: &str) -> Self {
        Self {
            now: DateTime::parse_from_rfc3339(s)
                .expect("valid RFC 3339")
                .with_timezone(&Utc),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&mut self, duration: chrono::Duration) {
        self.now += duration;
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl Clock for MockClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now
    }
}

/// Network time source with a fixed answer (or none, to simulate being offline).
#[cfg(any(test, feature = "test-seams"))]
#[derive(Debug, Clone)]
pub struct MockNetworkTime {
    now: Option<DateTime<Utc>>,
}

#[cfg(any(test, feature = "test-seams"))]
impl MockNetworkTime {
    /// A source that always reports `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Some(now) }
    }

    /// A source that cannot be reached.
    pub fn unreachable() -> Self {
        Self { now: None }
    }
}

#[cfg(any(test, feature = "test-seams"))]
impl NetworkTime for MockNetworkTime {
    fn network_now(&self) -> Option<DateTime<Utc>> {
        self.now
    }
}
