pub mod catalog;
pub mod circulation;
pub mod ledger;
pub mod registry;
pub mod reservation;

pub use crate::domain::model::{Availability, Book, BookId, Loan, Patron, PatronId};
pub use crate::domain::ports::{Clock, ConfigProvider, Storage};
pub use crate::utils::error::Result;
