use crate::domain::model::{Book, BookId};
use crate::utils::error::{LibraryError, Result};
use std::collections::{BTreeSet, HashMap};

/// Dual-indexed book collection.
///
/// `by_id` owns the books and answers exact lookups; `ordered` keeps the
/// identifiers sorted so substring searches visit books in identifier order.
/// Both indexes always hold the same key set.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    by_id: HashMap<BookId, Book>,
    ordered: BTreeSet<BookId>,
}

impl CatalogIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, book: Book) -> Result<()> {
        if self.by_id.contains_key(&book.id) {
            return Err(LibraryError::DuplicateIdentifier {
                id: book.id.to_string(),
            });
        }

        self.ordered.insert(book.id.clone());
        self.by_id.insert(book.id.clone(), book);
        Ok(())
    }

    pub fn remove(&mut self, id: &BookId) -> Result<Book> {
        let book = self
            .by_id
            .remove(id)
            .ok_or_else(|| LibraryError::not_found("Book", id))?;
        self.ordered.remove(id);
        Ok(book)
    }

    pub fn find_by_id(&self, id: &BookId) -> Option<&Book> {
        self.by_id.get(id)
    }

    pub(crate) fn find_by_id_mut(&mut self, id: &BookId) -> Option<&mut Book> {
        self.by_id.get_mut(id)
    }

    pub fn contains(&self, id: &BookId) -> bool {
        self.by_id.contains_key(id)
    }

    /// 書名子字串搜尋（不分大小寫）
    pub fn find_by_title_substring(&self, text: &str) -> Vec<&Book> {
        self.search(text, |book| book.title.as_str())
    }

    /// 作者子字串搜尋（不分大小寫）
    pub fn find_by_author_substring(&self, text: &str) -> Vec<&Book> {
        self.search(text, |book| book.author.as_str())
    }

    fn search<F>(&self, text: &str, field: F) -> Vec<&Book>
    where
        F: Fn(&Book) -> &str,
    {
        let needle = text.to_lowercase();
        self.iter()
            .filter(|book| field(*book).to_lowercase().contains(&needle))
            .collect()
    }

    /// All books in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Book> + '_ {
        self.ordered.iter().filter_map(|id| self.by_id.get(id))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Book> + '_ {
        self.by_id.values_mut()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, title: &str, author: &str, copies: u32) -> Book {
        Book::new(BookId::new(id).unwrap(), title, author, copies)
    }

    fn sample_catalog() -> CatalogIndex {
        let mut catalog = CatalogIndex::new();
        catalog.insert(book("B003", "Rust in Action", "Tim McNamara", 2)).unwrap();
        catalog.insert(book("B001", "Intro to Systems", "Ada Byron", 1)).unwrap();
        catalog.insert(book("B002", "Operating Systems", "Remzi Arpaci", 0)).unwrap();
        catalog
    }

    #[test]
    fn test_insert_rejects_duplicate_identifier() {
        let mut catalog = sample_catalog();
        let result = catalog.insert(book("B001", "Another Title", "Someone", 4));

        assert!(matches!(result, Err(LibraryError::DuplicateIdentifier { .. })));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.iter().count(), 3);
        let kept = catalog.find_by_id(&BookId::new("B001").unwrap()).unwrap();
        assert_eq!(kept.title, "Intro to Systems");
    }

    #[test]
    fn test_find_by_id() {
        let catalog = sample_catalog();
        let found = catalog.find_by_id(&BookId::new("B002").unwrap()).unwrap();
        assert_eq!(found.author, "Remzi Arpaci");
        assert!(catalog.find_by_id(&BookId::new("B999").unwrap()).is_none());
    }

    #[test]
    fn test_title_search_is_case_insensitive_and_ordered() {
        let catalog = sample_catalog();
        let ids: Vec<&str> = catalog
            .find_by_title_substring("SYSTEMS")
            .iter()
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(ids, vec!["B001", "B002"]);
    }

    #[test]
    fn test_author_search() {
        let catalog = sample_catalog();
        let results = catalog.find_by_author_substring("mcnam");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "B003");
        assert!(catalog.find_by_author_substring("nobody").is_empty());
    }

    #[test]
    fn test_empty_search_text_matches_everything() {
        let catalog = sample_catalog();
        assert_eq!(catalog.find_by_title_substring("").len(), 3);
    }

    #[test]
    fn test_remove_keeps_indexes_in_sync() {
        let mut catalog = sample_catalog();
        let removed = catalog.remove(&BookId::new("B002").unwrap()).unwrap();
        assert_eq!(removed.title, "Operating Systems");
        assert_eq!(catalog.iter().count(), 2);
        assert!(catalog.find_by_title_substring("Operating").is_empty());
        assert!(matches!(
            catalog.remove(&BookId::new("B002").unwrap()),
            Err(LibraryError::NotFound { .. })
        ));
    }
}
