//! Tabular encoding of the library state.
//!
//! Books and patrons keep the long-standing column layout; the loan column
//! packs each loan as `book,borrowed,due` and joins loans with `;`.

use crate::domain::model::{Book, BookId, Loan, Patron, PatronId, SettlementId, SettlementRecord};
use crate::utils::error::{LibraryError, Result};
use crate::utils::validation::{parse_copies, parse_date, DATE_FORMAT};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const LOAN_SEPARATOR: char = ';';
const LOAN_FIELD_SEPARATOR: char = ',';

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookRow {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub copies: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatronRow {
    pub patron_id: String,
    pub name: String,
    pub loans: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRow {
    pub settlement_id: u64,
    pub patron_id: String,
    pub book_id: String,
    pub days_overdue: u32,
    pub paid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationRow {
    pub book_id: String,
    pub position: usize,
    pub patron_id: String,
}

/// A loan as stored, before its book id is resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLoan {
    pub book_id: BookId,
    pub borrowed_on: NaiveDate,
    pub due_on: NaiveDate,
}

impl From<StoredLoan> for Loan {
    fn from(stored: StoredLoan) -> Self {
        Loan {
            book_id: stored.book_id,
            borrowed_on: stored.borrowed_on,
            due_on: stored.due_on,
        }
    }
}

pub fn encode_loans(loans: &[Loan]) -> String {
    loans
        .iter()
        .map(|loan| {
            format!(
                "{}{sep}{}{sep}{}",
                loan.book_id,
                loan.borrowed_on.format(DATE_FORMAT),
                loan.due_on.format(DATE_FORMAT),
                sep = LOAN_FIELD_SEPARATOR
            )
        })
        .collect::<Vec<_>>()
        .join(&LOAN_SEPARATOR.to_string())
}

pub fn decode_loans(encoded: &str) -> Result<Vec<StoredLoan>> {
    encoded
        .split(LOAN_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let parts: Vec<&str> = segment.split(LOAN_FIELD_SEPARATOR).collect();
            match parts.as_slice() {
                [book_id, borrowed, due] => Ok(StoredLoan {
                    book_id: BookId::new(book_id)?,
                    borrowed_on: parse_date("loan.borrowed_on", borrowed)?,
                    due_on: parse_date("loan.due_on", due)?,
                }),
                _ => Err(LibraryError::invalid_input(
                    "loans",
                    segment,
                    "Expected book,borrowed,due",
                )),
            }
        })
        .collect()
}

pub fn book_to_row(book: &Book) -> BookRow {
    BookRow {
        book_id: book.id.to_string(),
        title: book.title.clone(),
        author: book.author.clone(),
        copies: book.available_copies.to_string(),
    }
}

pub fn book_from_row(row: BookRow) -> Result<Book> {
    Ok(Book::new(
        BookId::new(&row.book_id)?,
        row.title,
        row.author,
        parse_copies("copies", &row.copies)?,
    ))
}

pub fn patron_to_row(patron: &Patron) -> PatronRow {
    PatronRow {
        patron_id: patron.id.to_string(),
        name: patron.name.clone(),
        loans: encode_loans(&patron.loans),
    }
}

pub fn settlement_to_row(record: &SettlementRecord) -> SettlementRow {
    SettlementRow {
        settlement_id: record.id.0,
        patron_id: record.patron_id.to_string(),
        book_id: record.book_id.to_string(),
        days_overdue: record.days_overdue,
        paid: record.paid,
    }
}

pub fn settlement_from_row(row: SettlementRow) -> Result<SettlementRecord> {
    Ok(SettlementRecord {
        id: SettlementId(row.settlement_id),
        patron_id: PatronId::new(&row.patron_id)?,
        book_id: BookId::new(&row.book_id)?,
        days_overdue: row.days_overdue,
        paid: row.paid,
    })
}

/// 將資料列序列化為含標題列的 CSV
pub fn write_rows<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| LibraryError::IoError(e.into_error()))
}

pub fn read_rows<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_reader(data);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
