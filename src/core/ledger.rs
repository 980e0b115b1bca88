use crate::domain::model::{BookId, PatronId, SettlementId, SettlementRecord};
use crate::utils::error::{LibraryError, Result};

/// Unpaid overdue settlements, in creation order.
#[derive(Debug, Clone)]
pub struct SettlementLedger {
    records: Vec<SettlementRecord>,
    next_id: u64,
}

impl Default for SettlementLedger {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl SettlementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從持久化紀錄重建帳本；已付款紀錄不再屬於帳本
    pub fn from_records(records: Vec<SettlementRecord>) -> Result<Self> {
        let mut ledger = Self::new();
        for record in records {
            let following = record.id.0.checked_add(1).ok_or_else(|| {
                LibraryError::invalid_input(
                    "settlement_id",
                    record.id,
                    "Settlement identifier out of range",
                )
            })?;
            ledger.next_id = ledger.next_id.max(following);
            if record.paid {
                tracing::debug!(settlement_id = %record.id, "Skipping paid settlement record");
                continue;
            }
            if ledger.find(record.id).is_some() {
                return Err(LibraryError::DuplicateIdentifier {
                    id: record.id.to_string(),
                });
            }
            ledger.records.push(record);
        }
        Ok(ledger)
    }

    pub(crate) fn open(
        &mut self,
        patron_id: PatronId,
        book_id: BookId,
        days_overdue: u32,
    ) -> Result<SettlementRecord> {
        let following = self.next_id.checked_add(1).ok_or_else(|| {
            LibraryError::invalid_input(
                "settlement_id",
                self.next_id,
                "No settlement identifiers left",
            )
        })?;
        let record = SettlementRecord {
            id: SettlementId(self.next_id),
            patron_id,
            book_id,
            days_overdue,
            paid: false,
        };
        self.next_id = following;
        self.records.push(record.clone());
        Ok(record)
    }

    pub(crate) fn remove(&mut self, id: SettlementId) -> Result<SettlementRecord> {
        let position = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| LibraryError::not_found("Settlement", id))?;
        Ok(self.records.remove(position))
    }

    pub fn find(&self, id: SettlementId) -> Option<&SettlementRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn for_patron<'a>(
        &'a self,
        patron_id: &'a PatronId,
    ) -> impl Iterator<Item = &'a SettlementRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| &record.patron_id == patron_id)
    }

    pub fn references_book(&self, book_id: &BookId) -> bool {
        self.records.iter().any(|record| &record.book_id == book_id)
    }

    pub fn references_patron(&self, patron_id: &PatronId) -> bool {
        self.records.iter().any(|record| &record.patron_id == patron_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettlementRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
