// Copyright (c) 2023 BASALT LABS <info@basalt.systems>

use std::fmt;
use std::ops::Add;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Milliseconds since 01/01/1970.
///
/// Also used for durations expressed in wall-clock milliseconds
/// (expiration windows, timer intervals).
#[derive(
    Debug, Clone, Copy, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Builds a timestamp from a millisecond count.
    pub const fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Millisecond count.
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// Current wall-clock time. A clock set before the epoch degrades to zero.
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Timestamp(since_epoch.as_millis() as u64)
    }

    /// Saturating addition.
    pub const fn saturating_add(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_add(other.0))
    }

    /// Saturating difference.
    pub const fn saturating_sub(self, other: Timestamp) -> Timestamp {
        Timestamp(self.0.saturating_sub(other.0))
    }

    /// Checked difference, `None` when `other` is later than `self`.
    pub fn checked_sub(self, other: Timestamp) -> Option<Timestamp> {
        self.0.checked_sub(other.0).map(Timestamp)
    }

    /// Conversion to a `std::time::Duration`, for timer arithmetic.
    pub const fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl Add for Timestamp {
    type Output = Timestamp;

    fn add(self, other: Timestamp) -> Timestamp {
        self.saturating_add(other)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Timestamp::from_millis(100);
        let b = Timestamp::from_millis(30);
        assert_eq!(a.saturating_sub(b), Timestamp::from_millis(70));
        assert_eq!(b.saturating_sub(a), Timestamp::from_millis(0));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(a + b, Timestamp::from_millis(130));
    }
}
