pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, Command};

pub use crate::adapters::store::LibraryStore;
pub use crate::config::{cli::LocalStorage, toml_config::LibraryConfig};
pub use crate::core::{
    catalog::CatalogIndex,
    circulation::{
        BookUpdate, CirculationService, ReservationStatus, ReturnOutcome, SettlementOutcome,
    },
    ledger::SettlementLedger,
    registry::PatronRegistry,
};
pub use crate::domain::model::{
    Availability, Book, BookId, CirculationPolicy, Loan, LoanState, Patron, PatronId,
    SettlementId, SettlementRecord,
};
pub use crate::domain::ports::{Clock, ConfigProvider, ManualClock, Storage, SystemClock};
pub use crate::utils::error::{LibraryError, Result};
