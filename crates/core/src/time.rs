use chrono::{DateTime, Utc};

/// Source of "now" for progress timestamps.
///
/// Services hold a `Clock` rather than calling `Utc::now()` directly so tests
/// can pin `updated_at` to a known instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

/// 2024-03-09T16:00:00Z, the first digital SAT administration date.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_710_000_000;

/// Deterministic timestamp for tests.
///
/// Falls back to the Unix epoch if the constant is ever made unrepresentable.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
