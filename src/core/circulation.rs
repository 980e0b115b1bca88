//! Borrow, return, reserve and settlement orchestration.
//!
//! [`CirculationService`] is the only writer of book and patron state. Every
//! operation checks all of its preconditions before it mutates anything, so a
//! rejected call leaves the catalog, registry and ledger untouched.

use crate::core::catalog::CatalogIndex;
use crate::core::ledger::SettlementLedger;
use crate::core::registry::PatronRegistry;
use crate::core::reservation;
use crate::domain::model::{
    Availability, Book, BookId, CirculationPolicy, Loan, LoanState, Patron, PatronId,
    SettlementId, SettlementRecord,
};
use crate::domain::ports::{Clock, SystemClock};
use crate::utils::error::{LibraryError, Result};
use crate::utils::validation::validate_non_empty_string;
use chrono::NaiveDate;
use serde::Serialize;

/// Result of a successful return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    pub patron_id: PatronId,
    pub book_id: BookId,
    pub returned_on: NaiveDate,
    pub days_overdue: i64,
    /// `Returned` for on-time returns, `PendingSettlement` when a fee is owed.
    pub state: LoanState,
    pub settlement: Option<SettlementRecord>,
    pub fee: Option<u64>,
    /// Head of the reservation queue. Taken off the queue only when the copy
    /// went back on the shelf; they still have to borrow explicitly.
    pub next_in_line: Option<PatronId>,
}

/// Result of paying an overdue settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementOutcome {
    #[serde(flatten)]
    pub record: SettlementRecord,
    pub fee: u64,
    /// Patron taken off the reservation queue now that the copy is released.
    pub next_in_line: Option<PatronId>,
}

/// A patron's place in one book's waiting list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationStatus {
    pub book_id: BookId,
    pub title: String,
    /// 從 1 開始的排隊位置
    pub position: usize,
    pub availability: Availability,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub copies: Option<u32>,
}

impl BookUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.copies.is_none()
    }
}

pub struct CirculationService<C: Clock = SystemClock> {
    catalog: CatalogIndex,
    registry: PatronRegistry,
    ledger: SettlementLedger,
    policy: CirculationPolicy,
    clock: C,
}

impl<C: Clock> CirculationService<C> {
    pub fn new(policy: CirculationPolicy, clock: C) -> Self {
        Self::from_parts(
            CatalogIndex::new(),
            PatronRegistry::new(),
            SettlementLedger::new(),
            policy,
            clock,
        )
    }

    pub fn from_parts(
        catalog: CatalogIndex,
        registry: PatronRegistry,
        ledger: SettlementLedger,
        policy: CirculationPolicy,
        clock: C,
    ) -> Self {
        Self {
            catalog,
            registry,
            ledger,
            policy,
            clock,
        }
    }

    pub fn catalog(&self) -> &CatalogIndex {
        &self.catalog
    }

    pub fn registry(&self) -> &PatronRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &SettlementLedger {
        &self.ledger
    }

    pub fn policy(&self) -> CirculationPolicy {
        self.policy
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ---------------------------------------------------------------------
    // Catalog and registry maintenance
    // ---------------------------------------------------------------------

    pub fn add_book(&mut self, book: Book) -> Result<()> {
        validate_non_empty_string("title", &book.title)?;
        validate_non_empty_string("author", &book.author)?;
        let book_id = book.id.clone();
        self.catalog.insert(book)?;
        tracing::info!(book_id = %book_id, "Added book");
        Ok(())
    }

    pub fn add_patron(&mut self, patron: Patron) -> Result<()> {
        validate_non_empty_string("name", &patron.name)?;
        let patron_id = patron.id.clone();
        self.registry.add_patron(patron)?;
        tracing::info!(patron_id = %patron_id, "Added patron");
        Ok(())
    }

    pub fn modify_book(&mut self, book_id: &BookId, update: BookUpdate) -> Result<&Book> {
        if let Some(title) = &update.title {
            validate_non_empty_string("title", title)?;
        }
        if let Some(author) = &update.author {
            validate_non_empty_string("author", author)?;
        }

        let book = self
            .catalog
            .find_by_id_mut(book_id)
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;

        if let Some(title) = update.title {
            book.title = title;
        }
        if let Some(author) = update.author {
            book.author = author;
        }
        if let Some(copies) = update.copies {
            book.available_copies = copies;
        }

        tracing::info!(
            book_id = %book.id,
            copies = book.available_copies,
            "Modified book"
        );
        Ok(book)
    }

    /// 刪除書籍；仍有借閱或未結清罰款時拒絕
    pub fn delete_book(&mut self, book_id: &BookId) -> Result<Book> {
        if !self.catalog.contains(book_id) {
            return Err(LibraryError::not_found("Book", book_id));
        }

        let holders = self.registry.loans_of_book(book_id).count();
        if holders > 0 {
            return Err(LibraryError::InUse {
                entity: "Book",
                id: book_id.to_string(),
                reason: format!("{} active loan(s)", holders),
            });
        }
        if self.ledger.references_book(book_id) {
            return Err(LibraryError::InUse {
                entity: "Book",
                id: book_id.to_string(),
                reason: "unpaid settlement records".to_string(),
            });
        }

        let book = self.catalog.remove(book_id)?;
        tracing::info!(book_id = %book_id, "Deleted book");
        Ok(book)
    }

    /// 刪除讀者；仍有借閱或未結清罰款時拒絕，並從所有預約佇列中移除
    pub fn delete_patron(&mut self, patron_id: &PatronId) -> Result<Patron> {
        let patron = self
            .registry
            .find_patron(patron_id)
            .ok_or_else(|| LibraryError::not_found("Patron", patron_id))?;

        if !patron.loans.is_empty() {
            return Err(LibraryError::InUse {
                entity: "Patron",
                id: patron_id.to_string(),
                reason: format!("{} active loan(s)", patron.loans.len()),
            });
        }
        if self.ledger.references_patron(patron_id) {
            return Err(LibraryError::InUse {
                entity: "Patron",
                id: patron_id.to_string(),
                reason: "unpaid settlement records".to_string(),
            });
        }

        let removed = self.registry.remove_patron(patron_id)?;
        let withdrawn = self
            .catalog
            .iter_mut()
            .map(|book| reservation::withdraw(book, patron_id))
            .filter(|withdrawn| *withdrawn)
            .count();
        tracing::info!(
            patron_id = %patron_id,
            withdrawn_reservations = withdrawn,
            "Deleted patron"
        );
        Ok(removed)
    }

    // ---------------------------------------------------------------------
    // Circulation
    // ---------------------------------------------------------------------

    pub fn borrow(&mut self, patron_id: &PatronId, book_id: &BookId) -> Result<Loan> {
        let patron = self
            .registry
            .find_patron(patron_id)
            .ok_or_else(|| LibraryError::not_found("Patron", patron_id))?;
        let book = self
            .catalog
            .find_by_id(book_id)
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;

        if patron.holds(book_id) {
            tracing::debug!(patron_id = %patron_id, book_id = %book_id, "Borrow rejected: already held");
            return Err(LibraryError::AlreadyBorrowed {
                patron_id: patron_id.to_string(),
                book_id: book_id.to_string(),
            });
        }
        if !book.is_available() {
            tracing::debug!(patron_id = %patron_id, book_id = %book_id, "Borrow rejected: no copies");
            return Err(LibraryError::Unavailable {
                book_id: book_id.to_string(),
            });
        }

        let borrowed_on = self.clock.today();
        let loan = Loan {
            book_id: book_id.clone(),
            borrowed_on,
            due_on: self.policy.due_date(borrowed_on)?,
        };

        if let Some(book) = self.catalog.find_by_id_mut(book_id) {
            book.available_copies -= 1;
            reservation::withdraw(book, patron_id);
        }
        if let Some(patron) = self.registry.find_patron_mut(patron_id) {
            patron.loans.push(loan.clone());
        }

        tracing::info!(
            patron_id = %patron_id,
            book_id = %book_id,
            borrowed_on = %loan.borrowed_on,
            due_on = %loan.due_on,
            "Book borrowed"
        );
        Ok(loan)
    }

    pub fn return_book(&mut self, patron_id: &PatronId, book_id: &BookId) -> Result<ReturnOutcome> {
        let returned_on = self.clock.today();
        let (loan_index, days_overdue) = self
            .registry
            .find_patron(patron_id)
            .and_then(|patron| {
                patron
                    .loans
                    .iter()
                    .enumerate()
                    .find(|(_, loan)| &loan.book_id == book_id)
            })
            .map(|(index, loan)| (index, loan.days_overdue(returned_on)))
            .ok_or_else(|| LibraryError::NotFound {
                entity: "Loan",
                id: format!("{}/{}", patron_id, book_id),
            })?;
        let book = self
            .catalog
            .find_by_id(book_id)
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;

        let state = if days_overdue > 0 {
            LoanState::PendingSettlement
        } else {
            LoanState::Returned
        };
        let restored_copies = if state.releases_copy() {
            Some(released_copies(book)?)
        } else {
            None
        };

        let settlement = if state == LoanState::PendingSettlement {
            let days = u32::try_from(days_overdue).unwrap_or(u32::MAX);
            Some(self.ledger.open(patron_id.clone(), book_id.clone(), days)?)
        } else {
            None
        };

        if let Some(patron) = self.registry.find_patron_mut(patron_id) {
            patron.loans.remove(loan_index);
        }

        // 逾期歸還時副本仍被保留，佇列首位要等結清後才出列
        let next_in_line = match self.catalog.find_by_id_mut(book_id) {
            Some(book) => match restored_copies {
                Some(copies) => {
                    book.available_copies = copies;
                    reservation::dequeue_next(book)
                }
                None => reservation::peek_next(book).cloned(),
            },
            None => None,
        };

        let fee = settlement
            .as_ref()
            .map(|record| record.fee(self.policy.fee_per_day));

        match &settlement {
            Some(record) => tracing::info!(
                patron_id = %patron_id,
                book_id = %book_id,
                days_overdue,
                settlement_id = %record.id,
                fee = fee.unwrap_or_default(),
                "Overdue book returned, awaiting settlement"
            ),
            None => tracing::info!(
                patron_id = %patron_id,
                book_id = %book_id,
                returned_on = %returned_on,
                "Book returned"
            ),
        }
        if let (Some(next), Some(_)) = (&next_in_line, restored_copies) {
            tracing::info!(book_id = %book_id, next_patron_id = %next, "Next reservation ready");
        }

        Ok(ReturnOutcome {
            patron_id: patron_id.clone(),
            book_id: book_id.clone(),
            returned_on,
            days_overdue,
            state,
            settlement,
            fee,
            next_in_line,
        })
    }

    pub fn reserve(&mut self, patron_id: &PatronId, book_id: &BookId) -> Result<Availability> {
        if self.registry.find_patron(patron_id).is_none() {
            return Err(LibraryError::not_found("Patron", patron_id));
        }

        let book = self
            .catalog
            .find_by_id_mut(book_id)
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;
        reservation::enqueue(book, patron_id.clone())?;
        let position = book.reservations.len();

        let availability = reservation::estimated_availability(book, &self.registry);
        tracing::info!(
            patron_id = %patron_id,
            book_id = %book_id,
            position,
            estimate = %availability,
            "Book reserved"
        );
        Ok(availability)
    }

    pub fn estimated_availability(&self, book_id: &BookId) -> Result<Availability> {
        let book = self
            .catalog
            .find_by_id(book_id)
            .ok_or_else(|| LibraryError::not_found("Book", book_id))?;
        Ok(reservation::estimated_availability(book, &self.registry))
    }

    /// 結清逾期罰款：釋放被保留的副本、從帳本移除紀錄，並讓預約佇列首位出列
    pub fn settle_payment(&mut self, settlement_id: SettlementId) -> Result<SettlementOutcome> {
        let book_id = self
            .ledger
            .find(settlement_id)
            .map(|record| record.book_id.clone())
            .ok_or_else(|| LibraryError::not_found("Settlement", settlement_id))?;
        let restored_copies = self
            .catalog
            .find_by_id(&book_id)
            .ok_or_else(|| LibraryError::not_found("Book", &book_id))
            .and_then(released_copies)?;

        let mut record = self.ledger.remove(settlement_id)?;
        record.paid = true;
        let next_in_line = match self.catalog.find_by_id_mut(&book_id) {
            Some(book) => {
                book.available_copies = restored_copies;
                reservation::dequeue_next(book)
            }
            None => None,
        };
        let fee = self.fee_for(&record);

        tracing::info!(
            settlement_id = %record.id,
            patron_id = %record.patron_id,
            book_id = %record.book_id,
            fee,
            "Settlement paid, copy released"
        );
        if let Some(next) = &next_in_line {
            tracing::info!(book_id = %book_id, next_patron_id = %next, "Next reservation ready");
        }

        Ok(SettlementOutcome {
            record,
            fee,
            next_in_line,
        })
    }

    /// Books the patron is waiting for, in identifier order.
    pub fn reservations_for(&self, patron_id: &PatronId) -> Result<Vec<ReservationStatus>> {
        if self.registry.find_patron(patron_id).is_none() {
            return Err(LibraryError::not_found("Patron", patron_id));
        }

        Ok(self
            .catalog
            .iter()
            .filter_map(|book| {
                let position = reservation::position_of(book, patron_id)?;
                Some(ReservationStatus {
                    book_id: book.id.clone(),
                    title: book.title.clone(),
                    position,
                    availability: reservation::estimated_availability(book, &self.registry),
                })
            })
            .collect())
    }

    // ---------------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------------

    pub fn fee_for(&self, record: &SettlementRecord) -> u64 {
        record.fee(self.policy.fee_per_day)
    }

    pub fn outstanding_fees(&self, patron_id: &PatronId) -> u64 {
        self.ledger
            .for_patron(patron_id)
            .map(|record| self.fee_for(record))
            .fold(0u64, u64::saturating_add)
    }

    /// Active loans whose due date is before `as_of`.
    pub fn overdue_loans(&self, as_of: NaiveDate) -> Vec<(&PatronId, &Loan)> {
        self.registry
            .iter()
            .flat_map(|patron| patron.loans.iter().map(move |loan| (&patron.id, loan)))
            .filter(|(_, loan)| loan.due_on < as_of)
            .collect()
    }
}

fn released_copies(book: &Book) -> Result<u32> {
    book.available_copies.checked_add(1).ok_or_else(|| {
        LibraryError::invalid_input(
            "available_copies",
            book.available_copies,
            format!("Copy count of book {} cannot grow any further", book.id),
        )
    })
}
