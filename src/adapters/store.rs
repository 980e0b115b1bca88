use crate::adapters::csv_codec::{
    book_from_row, book_to_row, decode_loans, patron_to_row, read_rows, settlement_from_row,
    settlement_to_row, write_rows, BookRow, PatronRow, ReservationRow, SettlementRow,
};
use crate::core::catalog::CatalogIndex;
use crate::core::circulation::CirculationService;
use crate::core::ledger::SettlementLedger;
use crate::core::registry::PatronRegistry;
use crate::domain::model::{BookId, Patron, PatronId};
use crate::domain::ports::{Clock, ConfigProvider, Storage};
use crate::utils::error::{LibraryError, Result};
use serde::de::DeserializeOwned;

/// Loads and saves a whole library snapshot through a [`Storage`] backend.
pub struct LibraryStore<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> LibraryStore<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn read_table<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        if !self.storage.exists(path).await? {
            tracing::debug!("{} not found, starting empty", path);
            return Ok(Vec::new());
        }
        let data = self.storage.read_file(path).await?;
        read_rows(&data)
    }

    /// 依序重播 insert(book) 與 addPatron(patron) 以重建狀態
    pub async fn load<K: Clock>(&self, clock: K) -> Result<CirculationService<K>> {
        let book_rows: Vec<BookRow> = self.read_table(self.config.books_file()).await?;
        let patron_rows: Vec<PatronRow> = self.read_table(self.config.patrons_file()).await?;
        let settlement_rows: Vec<SettlementRow> =
            self.read_table(self.config.settlements_file()).await?;
        let mut reservation_rows: Vec<ReservationRow> =
            self.read_table(self.config.reservations_file()).await?;

        let mut catalog = CatalogIndex::new();
        for row in book_rows {
            catalog.insert(book_from_row(row)?)?;
        }

        let mut registry = PatronRegistry::new();
        for row in patron_rows {
            let mut patron = Patron::new(PatronId::new(&row.patron_id)?, row.name);
            for stored in decode_loans(&row.loans)? {
                if !catalog.contains(&stored.book_id) {
                    tracing::warn!(
                        patron_id = %patron.id,
                        book_id = %stored.book_id,
                        "Dropping loan for unknown book"
                    );
                    continue;
                }
                if patron.holds(&stored.book_id) {
                    return Err(LibraryError::invalid_input(
                        "loans",
                        &row.loans,
                        format!("Book {} appears twice", stored.book_id),
                    ));
                }
                patron.loans.push(stored.into());
            }
            registry.add_patron(patron)?;
        }

        reservation_rows.sort_by(|a, b| {
            a.book_id
                .cmp(&b.book_id)
                .then(a.position.cmp(&b.position))
        });
        for row in reservation_rows {
            let book_id = BookId::new(&row.book_id)?;
            let patron_id = PatronId::new(&row.patron_id)?;
            if registry.find_patron(&patron_id).is_none() {
                tracing::warn!(patron_id = %patron_id, book_id = %book_id, "Dropping reservation for unknown patron");
                continue;
            }
            match catalog.find_by_id_mut(&book_id) {
                Some(book) if !book.reservations.contains(&patron_id) => {
                    book.reservations.push_back(patron_id);
                }
                Some(_) => {
                    tracing::warn!(patron_id = %patron_id, book_id = %book_id, "Dropping duplicate reservation");
                }
                None => {
                    tracing::warn!(patron_id = %patron_id, book_id = %book_id, "Dropping reservation for unknown book");
                }
            }
        }

        let records = settlement_rows
            .into_iter()
            .map(settlement_from_row)
            .collect::<Result<Vec<_>>>()?;
        let ledger = SettlementLedger::from_records(records)?;

        tracing::info!(
            books = catalog.len(),
            patrons = registry.len(),
            settlements = ledger.len(),
            "Library state loaded"
        );

        Ok(CirculationService::from_parts(
            catalog,
            registry,
            ledger,
            self.config.policy(),
            clock,
        ))
    }

    pub async fn save<K: Clock>(&self, service: &CirculationService<K>) -> Result<()> {
        let books = write_rows(service.catalog().iter().map(book_to_row))?;
        let patrons = write_rows(service.registry().iter().map(patron_to_row))?;
        let settlements = write_rows(service.ledger().iter().map(settlement_to_row))?;
        let reservations = write_rows(service.catalog().iter().flat_map(|book| {
            book.reservations
                .iter()
                .enumerate()
                .map(move |(position, patron_id)| ReservationRow {
                    book_id: book.id.to_string(),
                    position,
                    patron_id: patron_id.to_string(),
                })
        }))?;

        self.storage
            .write_file(self.config.books_file(), &books)
            .await?;
        self.storage
            .write_file(self.config.patrons_file(), &patrons)
            .await?;
        self.storage
            .write_file(self.config.settlements_file(), &settlements)
            .await?;
        self.storage
            .write_file(self.config.reservations_file(), &reservations)
            .await?;

        tracing::debug!(
            books = service.catalog().len(),
            patrons = service.registry().len(),
            "Library state saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Book, CirculationPolicy};
    use crate::domain::ports::ManualClock;
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn put(&self, path: &str, contents: &str) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), contents.as_bytes().to_vec());
        }

        async fn get_text(&self, path: &str) -> Option<String> {
            let files = self.files.lock().await;
            files
                .get(path)
                .map(|data| String::from_utf8_lossy(data).into_owned())
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                LibraryError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        async fn exists(&self, path: &str) -> Result<bool> {
            let files = self.files.lock().await;
            Ok(files.contains_key(path))
        }
    }

    struct MockConfig;

    impl ConfigProvider for MockConfig {
        fn data_dir(&self) -> &str {
            "."
        }

        fn books_file(&self) -> &str {
            "books.csv"
        }

        fn patrons_file(&self) -> &str {
            "patrons.csv"
        }

        fn settlements_file(&self) -> &str {
            "settlements.csv"
        }

        fn reservations_file(&self) -> &str {
            "reservations.csv"
        }

        fn policy(&self) -> CirculationPolicy {
            CirculationPolicy::default()
        }
    }

    fn clock() -> ManualClock {
        ManualClock::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    }

    #[tokio::test]
    async fn test_load_from_empty_storage() {
        let store = LibraryStore::new(MockStorage::new(), MockConfig);
        let service = store.load(clock()).await.unwrap();
        assert!(service.catalog().is_empty());
        assert!(service.registry().is_empty());
        assert!(service.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_load_drops_loans_for_unknown_books() {
        let storage = MockStorage::new();
        storage
            .put("books.csv", "book_id,title,author,copies\nB001,Intro to Systems,Ada,0\n")
            .await;
        storage
            .put(
                "patrons.csv",
                "patron_id,name,loans\nU1,Grace,\"B001,2024-02-01,2024-02-15;B404,2024-02-01,2024-02-15\"\n",
            )
            .await;

        let store = LibraryStore::new(storage, MockConfig);
        let service = store.load(clock()).await.unwrap();
        let loans = service
            .registry()
            .active_loans(&PatronId::new("U1").unwrap())
            .unwrap();
        assert_eq!(loans.len(), 1);
        assert_eq!(loans[0].book_id.as_str(), "B001");
    }

    #[tokio::test]
    async fn test_load_rejects_duplicate_books() {
        let storage = MockStorage::new();
        storage
            .put(
                "books.csv",
                "book_id,title,author,copies\nB001,Intro,Ada,1\nB001,Again,Ada,2\n",
            )
            .await;
        let store = LibraryStore::new(storage, MockConfig);
        assert!(matches!(
            store.load(clock()).await,
            Err(LibraryError::DuplicateIdentifier { .. })
        ));
    }

    #[tokio::test]
    async fn test_save_writes_all_tables() {
        let storage = MockStorage::new();
        let store = LibraryStore::new(storage.clone(), MockConfig);
        let mut service = store.load(clock()).await.unwrap();
        service
            .add_book(Book::new(BookId::new("B002").unwrap(), "Operating Systems", "Remzi", 0))
            .unwrap();
        service
            .add_patron(Patron::new(PatronId::new("U2").unwrap(), "Linus"))
            .unwrap();
        service
            .reserve(&PatronId::new("U2").unwrap(), &BookId::new("B002").unwrap())
            .unwrap();

        store.save(&service).await.unwrap();

        let books = storage.get_text("books.csv").await.unwrap();
        assert!(books.contains("B002,Operating Systems,Remzi,0"));
        let reservations = storage.get_text("reservations.csv").await.unwrap();
        assert!(reservations.contains("B002,0,U2"));
        let settlements = storage.get_text("settlements.csv").await.unwrap();
        assert!(settlements.is_empty() || settlements.starts_with("settlement_id"));

        let reloaded = store.load(clock()).await.unwrap();
        let book = reloaded
            .catalog()
            .find_by_id(&BookId::new("B002").unwrap())
            .unwrap();
        assert_eq!(book.reservations.len(), 1);
    }
}
