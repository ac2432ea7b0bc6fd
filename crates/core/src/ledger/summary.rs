//! Period and category summaries.
//!
//! Period windows are calendar-anchored in the reference timezone: weeks
//! start on Monday, months on the first, years on January 1st. A window is
//! the half-open interval `[start, end)` converted back to UTC.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::LedgerError;
use super::types::{Transaction, TransactionType};

/// Calendar granularity of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SummaryPeriod {
    /// Monday to Sunday.
    Weekly,
    /// Calendar month.
    Monthly,
    /// Calendar year.
    Yearly,
}

impl std::str::FromStr for SummaryPeriod {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(LedgerError::InvalidPeriod(s.to_string())),
        }
    }
}

/// A half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    /// First instant inside the window.
    pub start: DateTime<Utc>,
    /// First instant after the window.
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    /// Returns true if `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

impl SummaryPeriod {
    /// Returns the calendar window around `now` in `tz`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Internal` if a boundary date cannot be
    /// represented, which only happens at the edges of the calendar.
    pub fn window_containing(self, now: DateTime<Utc>, tz: Tz) -> Result<PeriodWindow, LedgerError> {
        let today = now.with_timezone(&tz).date_naive();
        let out_of_range = || LedgerError::Internal(format!("no {self:?} window around {now}"));

        let (first, next) = match self {
            Self::Weekly => {
                let first = today
                    .checked_sub_days(Days::new(u64::from(today.weekday().num_days_from_monday())))
                    .ok_or_else(out_of_range)?;
                (first, first.checked_add_days(Days::new(7)))
            }
            Self::Monthly => {
                let first = today.with_day(1).ok_or_else(out_of_range)?;
                (first, first.checked_add_months(Months::new(1)))
            }
            Self::Yearly => {
                let first = NaiveDate::from_ymd_opt(today.year(), 1, 1).ok_or_else(out_of_range)?;
                (first, first.checked_add_months(Months::new(12)))
            }
        };
        let next = next.ok_or_else(out_of_range)?;

        Ok(PeriodWindow {
            start: local_midnight(first, tz).ok_or_else(out_of_range)?,
            end: local_midnight(next, tz).ok_or_else(out_of_range)?,
        })
    }
}

/// Start of `date` in `tz`, as UTC.
///
/// When midnight falls in a DST gap the day starts at the first valid hour.
#[must_use]
pub fn local_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    (0..=2).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        tz.from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    })
}

/// Total for one transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTotal {
    /// Direction.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Total for one expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    /// Category label, as first recorded.
    pub category: String,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Totals per type over entries inside `window`. Both types are always reported.
pub fn totals_by_type<'a, I>(entries: I, window: &PeriodWindow) -> Vec<TypeTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;
    for entry in entries.into_iter().filter(|e| window.contains(e.created_at)) {
        match entry.transaction_type {
            TransactionType::Income => income += entry.amount,
            TransactionType::Expense => expense += entry.amount,
        }
    }

    TransactionType::ALL
        .into_iter()
        .map(|transaction_type| TypeTotal {
            transaction_type,
            total: match transaction_type {
                TransactionType::Income => income,
                TransactionType::Expense => expense,
            },
        })
        .collect()
}

/// All-time expense totals per category, largest first.
///
/// Categories are grouped case-insensitively.
pub fn totals_by_category<'a, I>(entries: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for entry in entries
        .into_iter()
        .filter(|e| e.transaction_type == TransactionType::Expense)
    {
        let key = entry.category.to_lowercase();
        match totals.iter_mut().find(|t| t.category.to_lowercase() == key) {
            Some(total) => total.total += entry.amount,
            None => totals.push(CategoryTotal {
                category: entry.category.clone(),
                total: entry.amount,
            }),
        }
    }

    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    totals
}
