use crate::utils::error::{LibraryError, Result};
use crate::utils::validation::validate_identifier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();
        validate_identifier("book_id", value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatronId(String);

impl PatronId {
    pub fn new(value: &str) -> Result<Self> {
        let value = value.trim();
        validate_identifier("patron_id", value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettlementId(pub u64);

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub available_copies: u32,
    /// 等待中的讀者（先進先出），只在沒有可借副本時使用
    #[serde(default)]
    pub reservations: VecDeque<PatronId>,
}

impl Book {
    pub fn new(id: BookId, title: impl Into<String>, author: impl Into<String>, copies: u32) -> Self {
        Self {
            id,
            title: title.into(),
            author: author.into(),
            available_copies: copies,
            reservations: VecDeque::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub book_id: BookId,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

impl Loan {
    /// 逾期天數；零或負數表示準時歸還
    pub fn days_overdue(&self, returned_on: NaiveDate) -> i64 {
        (returned_on - self.due_on).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patron {
    pub id: PatronId,
    pub name: String,
    pub loans: Vec<Loan>,
}

impl Patron {
    pub fn new(id: PatronId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            loans: Vec::new(),
        }
    }

    pub fn loan_for(&self, book_id: &BookId) -> Option<&Loan> {
        self.loans.iter().find(|loan| &loan.book_id == book_id)
    }

    pub fn holds(&self, book_id: &BookId) -> bool {
        self.loan_for(book_id).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub id: SettlementId,
    pub patron_id: PatronId,
    pub book_id: BookId,
    pub days_overdue: u32,
    pub paid: bool,
}

impl SettlementRecord {
    pub fn fee(&self, fee_per_day: u64) -> u64 {
        u64::from(self.days_overdue).saturating_mul(fee_per_day)
    }
}

/// Lifecycle of a single (book, patron) loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanState {
    NotBorrowed,
    OnLoan,
    Returned,
    PendingSettlement,
    Settled,
}

impl LoanState {
    /// Whether the copy has been released back to the shelf in this state.
    pub fn releases_copy(self) -> bool {
        matches!(self, LoanState::Returned | LoanState::Settled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "date", rename_all = "snake_case")]
pub enum Availability {
    AvailableNow,
    ExpectedOn(NaiveDate),
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::AvailableNow => f.write_str("available-now"),
            Availability::ExpectedOn(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;
pub const DEFAULT_FEE_PER_DAY: u64 = 1;
/// 借閱期上限（約十年）
pub const MAX_LOAN_PERIOD_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CirculationPolicy {
    pub loan_period_days: u32,
    pub fee_per_day: u64,
}

impl Default for CirculationPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            fee_per_day: DEFAULT_FEE_PER_DAY,
        }
    }
}

impl CirculationPolicy {
    pub fn due_date(&self, borrowed_on: NaiveDate) -> Result<NaiveDate> {
        borrowed_on
            .checked_add_days(chrono::Days::new(u64::from(self.loan_period_days)))
            .ok_or_else(|| {
                LibraryError::invalid_input(
                    "loan_period_days",
                    self.loan_period_days,
                    format!("Due date out of range when borrowing on {}", borrowed_on),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_trimmed_and_validated() {
        assert_eq!(BookId::new("  B001 ").unwrap().as_str(), "B001");
        assert!(BookId::new("").is_err());
        assert!(PatronId::new("U1;U2").is_err());
    }

    #[test]
    fn test_days_overdue() {
        let loan = Loan {
            book_id: BookId::new("B001").unwrap(),
            borrowed_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            due_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        };
        assert_eq!(loan.days_overdue(NaiveDate::from_ymd_opt(2024, 1, 21).unwrap()), 6);
        assert_eq!(loan.days_overdue(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()), 0);
        assert_eq!(loan.days_overdue(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()), -5);
    }

    #[test]
    fn test_fee_is_linear() {
        let record = SettlementRecord {
            id: SettlementId(1),
            patron_id: PatronId::new("U1").unwrap(),
            book_id: BookId::new("B001").unwrap(),
            days_overdue: 6,
            paid: false,
        };
        assert_eq!(record.fee(1), 6);
        assert_eq!(record.fee(5), 30);
    }

    #[test]
    fn test_loan_state_copy_release() {
        assert!(LoanState::Returned.releases_copy());
        assert!(!LoanState::OnLoan.releases_copy());
        assert!(!LoanState::PendingSettlement.releases_copy());
        assert!(LoanState::Settled.releases_copy());
    }

    #[test]
    fn test_default_policy_due_date() {
        let policy = CirculationPolicy::default();
        let borrowed = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(
            policy.due_date(borrowed).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_due_date_out_of_range_is_an_error() {
        let policy = CirculationPolicy {
            loan_period_days: u32::MAX,
            ..Default::default()
        };
        let borrowed = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            policy.due_date(borrowed),
            Err(LibraryError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_availability_display() {
        assert_eq!(Availability::AvailableNow.to_string(), "available-now");
        let date = NaiveDate::from_ymd_opt(2024, 2, 9).unwrap();
        assert_eq!(Availability::ExpectedOn(date).to_string(), "2024-02-09");
    }
}
