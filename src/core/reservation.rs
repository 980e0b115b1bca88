//! Per-book FIFO waiting list.
//!
//! The queue lives on [`Book::reservations`]; these functions are the only
//! way the circulation service touches it.

use crate::core::registry::PatronRegistry;
use crate::domain::model::{Availability, Book, PatronId};
use crate::utils::error::{LibraryError, Result};

pub fn enqueue(book: &mut Book, patron_id: PatronId) -> Result<()> {
    if book.is_available() {
        return Err(LibraryError::AlreadyAvailable {
            book_id: book.id.to_string(),
            available: book.available_copies,
        });
    }

    if book.reservations.contains(&patron_id) {
        return Err(LibraryError::AlreadyReserved {
            patron_id: patron_id.to_string(),
            book_id: book.id.to_string(),
        });
    }

    book.reservations.push_back(patron_id);
    Ok(())
}

pub fn dequeue_next(book: &mut Book) -> Option<PatronId> {
    book.reservations.pop_front()
}

pub fn peek_next(book: &Book) -> Option<&PatronId> {
    book.reservations.front()
}

/// 1-based place of the patron in the waiting list.
pub fn position_of(book: &Book, patron_id: &PatronId) -> Option<usize> {
    book.reservations
        .iter()
        .position(|queued| queued == patron_id)
        .map(|index| index + 1)
}

/// Drop a patron from the waiting list. Returns whether they were queued.
pub fn withdraw(book: &mut Book, patron_id: &PatronId) -> bool {
    let before = book.reservations.len();
    book.reservations.retain(|queued| queued != patron_id);
    before != book.reservations.len()
}

/// 預估可借日期：佇列中讀者所持有此書的最早到期日；若無則立即可借
pub fn estimated_availability(book: &Book, registry: &PatronRegistry) -> Availability {
    book.reservations
        .iter()
        .filter_map(|queued| registry.find_patron(queued))
        .filter_map(|patron| patron.loan_for(&book.id))
        .map(|loan| loan.due_on)
        .min()
        .map_or(Availability::AvailableNow, Availability::ExpectedOn)
}
