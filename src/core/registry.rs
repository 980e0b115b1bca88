use crate::domain::model::{BookId, Loan, Patron, PatronId};
use crate::utils::error::{LibraryError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PatronRegistry {
    patrons: BTreeMap<PatronId, Patron>,
}

impl PatronRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_patron(&mut self, patron: Patron) -> Result<()> {
        if self.patrons.contains_key(&patron.id) {
            return Err(LibraryError::DuplicateIdentifier {
                id: patron.id.to_string(),
            });
        }
        self.patrons.insert(patron.id.clone(), patron);
        Ok(())
    }

    pub fn remove_patron(&mut self, id: &PatronId) -> Result<Patron> {
        self.patrons
            .remove(id)
            .ok_or_else(|| LibraryError::not_found("Patron", id))
    }

    pub fn find_patron(&self, id: &PatronId) -> Option<&Patron> {
        self.patrons.get(id)
    }

    pub(crate) fn find_patron_mut(&mut self, id: &PatronId) -> Option<&mut Patron> {
        self.patrons.get_mut(id)
    }

    pub fn active_loans(&self, id: &PatronId) -> Result<&[Loan]> {
        self.find_patron(id)
            .map(|patron| patron.loans.as_slice())
            .ok_or_else(|| LibraryError::not_found("Patron", id))
    }

    /// 目前持有指定書籍的借閱紀錄
    pub fn loans_of_book<'a>(
        &'a self,
        book_id: &'a BookId,
    ) -> impl Iterator<Item = (&'a PatronId, &'a Loan)> + 'a {
        self.patrons.values().filter_map(move |patron| {
            patron.loan_for(book_id).map(|loan| (&patron.id, loan))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Patron> + '_ {
        self.patrons.values()
    }

    pub fn len(&self) -> usize {
        self.patrons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patrons.is_empty()
    }
}
