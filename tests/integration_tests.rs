use chrono::NaiveDate;
use small_library::{
    Availability, Book, BookId, BookUpdate, CirculationPolicy, CirculationService, LibraryError,
    LoanState, ManualClock, Patron, PatronId,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn bid(id: &str) -> BookId {
    BookId::new(id).unwrap()
}

fn pid(id: &str) -> PatronId {
    PatronId::new(id).unwrap()
}

fn library(start: NaiveDate) -> CirculationService<ManualClock> {
    let mut service = CirculationService::new(CirculationPolicy::default(), ManualClock::new(start));
    service
        .add_book(Book::new(bid("B001"), "Intro to Systems", "Ada Byron", 1))
        .unwrap();
    service
        .add_book(Book::new(bid("B002"), "Distributed Systems", "Maarten van Steen", 0))
        .unwrap();
    service
        .add_book(Book::new(bid("B003"), "The Rust Programming Language", "Steve Klabnik", 3))
        .unwrap();
    for (id, name) in [("U1", "Grace"), ("U2", "Linus"), ("P1", "Ada"), ("P2", "Alan"), ("P3", "Barbara")] {
        service.add_patron(Patron::new(pid(id), name)).unwrap();
    }
    service
}

fn assert_copies_never_negative(service: &CirculationService<ManualClock>) {
    // u32 cannot go negative; make sure nothing wrapped around either
    for book in service.catalog().iter() {
        assert!(book.available_copies < u32::MAX / 2, "{} wrapped", book.id);
    }
}

#[test]
fn test_overdue_settlement_scenario() {
    let service = &mut library(date(2024, 1, 1));

    let loan = service.borrow(&pid("U1"), &bid("B001")).unwrap();
    assert_eq!(loan.due_on, date(2024, 1, 15));

    service.clock().advance_days(20);
    let outcome = service.return_book(&pid("U1"), &bid("B001")).unwrap();
    assert_eq!(outcome.days_overdue, 6);
    assert_eq!(outcome.state, LoanState::PendingSettlement);
    assert_eq!(outcome.fee, Some(6));

    let record = outcome.settlement.expect("settlement record");
    assert_eq!(record.patron_id, pid("U1"));
    assert_eq!(record.book_id, bid("B001"));
    assert!(!record.paid);
    assert_eq!(
        service.catalog().find_by_id(&bid("B001")).unwrap().available_copies,
        0
    );
    assert!(service.ledger().find(record.id).is_some());

    let paid = service.settle_payment(record.id).unwrap();
    assert!(paid.record.paid);
    assert_eq!(paid.fee, 6);
    assert_eq!(
        service.catalog().find_by_id(&bid("B001")).unwrap().available_copies,
        1
    );
    assert!(service.ledger().find(record.id).is_none());
    assert_copies_never_negative(service);
}

#[test]
fn test_reserve_on_empty_shelf_reports_available_now() {
    let mut service = library(date(2024, 1, 1));
    let estimate = service.reserve(&pid("U2"), &bid("B002")).unwrap();
    assert_eq!(estimate, Availability::AvailableNow);
    assert_eq!(estimate.to_string(), "available-now");
}

#[test]
fn test_reservation_queue_is_fifo() {
    let mut service = library(date(2024, 1, 1));
    service
        .modify_book(&bid("B002"), BookUpdate { copies: Some(1), ..Default::default() })
        .unwrap();
    service.borrow(&pid("U1"), &bid("B002")).unwrap();

    for patron in ["P1", "P2", "P3"] {
        service.reserve(&pid(patron), &bid("B002")).unwrap();
    }

    let mut served = Vec::new();
    for _ in 0..3 {
        let holder = service
            .registry()
            .loans_of_book(&bid("B002"))
            .map(|(id, _)| id.clone())
            .next()
            .unwrap();
        let outcome = service.return_book(&holder, &bid("B002")).unwrap();
        let next = outcome.next_in_line.expect("queued patron");
        service.borrow(&next, &bid("B002")).unwrap();
        served.push(next);
    }

    assert_eq!(served, vec![pid("P1"), pid("P2"), pid("P3")]);
    assert_copies_never_negative(&service);
}

#[test]
fn test_borrow_and_return_copy_accounting() {
    let mut service = library(date(2024, 5, 1));
    let copies = |s: &CirculationService<ManualClock>| {
        s.catalog().find_by_id(&bid("B003")).unwrap().available_copies
    };

    service.borrow(&pid("U1"), &bid("B003")).unwrap();
    assert_eq!(copies(&service), 2);
    service.borrow(&pid("U2"), &bid("B003")).unwrap();
    assert_eq!(copies(&service), 1);

    assert!(matches!(
        service.borrow(&pid("U1"), &bid("B003")),
        Err(LibraryError::AlreadyBorrowed { .. })
    ));
    assert_eq!(copies(&service), 1);

    service.clock().advance_days(10);
    service.return_book(&pid("U1"), &bid("B003")).unwrap();
    assert_eq!(copies(&service), 2);

    service.clock().advance_days(10);
    let late = service.return_book(&pid("U2"), &bid("B003")).unwrap();
    assert_eq!(late.days_overdue, 6);
    assert_eq!(copies(&service), 2);
}

#[test]
fn test_reserve_fails_when_copies_exist() {
    let mut service = library(date(2024, 1, 1));
    let result = service.reserve(&pid("U1"), &bid("B003"));
    assert!(matches!(
        result,
        Err(LibraryError::AlreadyAvailable { available: 3, .. })
    ));
    assert!(service
        .catalog()
        .find_by_id(&bid("B003"))
        .unwrap()
        .reservations
        .is_empty());
}

#[test]
fn test_borrowing_empty_shelf_points_to_reserve() {
    let mut service = library(date(2024, 1, 1));
    let err = service.borrow(&pid("U1"), &bid("B002")).unwrap_err();
    assert!(matches!(err, LibraryError::Unavailable { .. }));
    assert_eq!(err.recovery_suggestion(), "Reserve the book to join its waiting list");
}

#[test]
fn test_search_after_modify() {
    let mut service = library(date(2024, 1, 1));
    assert_eq!(service.catalog().find_by_title_substring("systems").len(), 2);

    service
        .modify_book(
            &bid("B002"),
            BookUpdate {
                title: Some("Designing Data-Intensive Applications".to_string()),
                author: Some("Martin Kleppmann".to_string()),
                copies: None,
            },
        )
        .unwrap();

    let by_title = service.catalog().find_by_title_substring("systems");
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].id, bid("B001"));

    let by_author = service.catalog().find_by_author_substring("KLEPP");
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].id, bid("B002"));
}

#[test]
fn test_failed_operations_leave_state_untouched() {
    let mut service = library(date(2024, 1, 1));
    service.borrow(&pid("U1"), &bid("B001")).unwrap();
    let before_loans = service.registry().active_loans(&pid("U1")).unwrap().to_vec();

    assert!(service.borrow(&pid("U1"), &bid("B001")).is_err());
    assert!(service.return_book(&pid("U2"), &bid("B001")).is_err());
    assert!(service.delete_patron(&pid("U1")).is_err());
    assert!(service.delete_book(&bid("B001")).is_err());

    assert_eq!(
        service.registry().active_loans(&pid("U1")).unwrap(),
        before_loans.as_slice()
    );
    assert_eq!(
        service.catalog().find_by_id(&bid("B001")).unwrap().available_copies,
        0
    );
    assert!(service.ledger().is_empty());
}
