//! Edit/delete window policy.
//!
//! A transaction may be amended or removed only while its age is at most the
//! window length. The check is a pure function of `created_at` and the
//! request time; nothing is cached on the entry, so an entry locks exactly
//! at the boundary and stays locked.

use chrono::{DateTime, Duration, Utc};

use super::error::LedgerError;
use super::types::Transaction;

/// Default window length in hours.
pub const DEFAULT_EDIT_WINDOW_HOURS: u32 = 12;

/// Stateless edit-window predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditWindow {
    length: Duration,
}

impl EditWindow {
    /// Creates a window of the given number of hours.
    #[must_use]
    pub fn hours(hours: u32) -> Self {
        Self {
            length: Duration::hours(i64::from(hours)),
        }
    }

    /// Returns the window length.
    #[must_use]
    pub const fn length(&self) -> Duration {
        self.length
    }

    /// Returns the instant after which an entry created at `created_at` is locked.
    #[must_use]
    pub fn locks_at(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.length
    }

    /// `now - created_at <= length`.
    #[must_use]
    pub fn is_editable(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - created_at <= self.length
    }

    /// Fails with [`LedgerError::EditWindowExpired`] once the entry is locked.
    pub fn ensure_editable(&self, entry: &Transaction, now: DateTime<Utc>) -> Result<(), LedgerError> {
        if self.is_editable(entry.created_at, now) {
            Ok(())
        } else {
            Err(LedgerError::EditWindowExpired {
                transaction_id: entry.id,
                locked_at: self.locks_at(entry.created_at),
            })
        }
    }
}

impl Default for EditWindow {
    fn default() -> Self {
        Self::hours(DEFAULT_EDIT_WINDOW_HOURS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
    }

    #[rstest]
    #[case(Duration::zero(), true)]
    #[case(Duration::hours(12) - Duration::seconds(1), true)]
    #[case(Duration::hours(12), true)]
    #[case(Duration::hours(12) + Duration::seconds(1), false)]
    #[case(Duration::hours(13), false)]
    fn test_window_boundary(#[case] age: Duration, #[case] editable: bool) {
        let window = EditWindow::default();
        assert_eq!(window.is_editable(t0(), t0() + age), editable);
    }

    #[test]
    fn test_custom_window_length() {
        let window = EditWindow::hours(1);
        assert!(window.is_editable(t0(), t0() + Duration::minutes(59)));
        assert!(!window.is_editable(t0(), t0() + Duration::minutes(61)));
        assert_eq!(window.locks_at(t0()), t0() + Duration::hours(1));
    }

    #[test]
    fn test_locked_stays_locked() {
        let window = EditWindow::default();
        let later = t0() + Duration::hours(12) + Duration::seconds(1);
        for extra in [0, 60, 3600, 86_400] {
            assert!(!window.is_editable(t0(), later + Duration::seconds(extra)));
        }
    }
}
