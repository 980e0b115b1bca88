use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use small_library::config::SearchField;
use small_library::utils::error::ErrorSeverity;
use small_library::utils::validation::{parse_copies, parse_date, Validate};
use small_library::utils::logger;
use small_library::{
    Book, BookId, BookUpdate, CirculationService, CliConfig, Clock, Command, LibraryConfig,
    LibraryError, LibraryStore, LocalStorage, Patron, PatronId, SettlementId, SettlementRecord,
    SystemClock,
};
use std::path::Path;

/// What a command produced, and whether it changed library state.
struct Outcome {
    mutated: bool,
    text: Vec<String>,
    json: serde_json::Value,
}

impl Outcome {
    fn read<T: Serialize>(text: Vec<String>, value: &T) -> Result<Self, LibraryError> {
        Ok(Self {
            mutated: false,
            text,
            json: serde_json::to_value(value)?,
        })
    }

    fn write<T: Serialize>(text: Vec<String>, value: &T) -> Result<Self, LibraryError> {
        Ok(Self {
            mutated: true,
            ..Self::read(text, value)?
        })
    }
}

#[derive(Serialize)]
struct SettlementView<'a> {
    #[serde(flatten)]
    record: &'a SettlementRecord,
    fee: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    // 初始化日誌
    if config.json_logging() {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    if cli.command.requires_admin() && !cli.admin {
        eprintln!("❌ This command requires librarian privileges");
        eprintln!("💡 Re-run with --admin");
        std::process::exit(1);
    }

    tracing::info!("📚 {} (data: {})", config.library.name, config.storage.data_dir);

    let storage = LocalStorage::new(config.storage.data_dir.clone());
    let store = LibraryStore::new(storage, config);

    match run(&store, &cli).await {
        Ok(outcome) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome.json)?);
            } else {
                for line in &outcome.text {
                    println!("{}", line);
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 業務規則拒絕
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn load_config(path: &str) -> anyhow::Result<LibraryConfig> {
    if !Path::new(path).exists() {
        return Ok(LibraryConfig::default());
    }
    LibraryConfig::from_file(path)
        .with_context(|| format!("Failed to load config file '{}'", path))
}

async fn run(
    store: &LibraryStore<LocalStorage, LibraryConfig>,
    cli: &CliConfig,
) -> Result<Outcome, LibraryError> {
    let mut service = store.load(SystemClock).await?;
    let outcome = execute(&mut service, &cli.command)?;

    if outcome.mutated {
        store.save(&service).await?;
    }
    Ok(outcome)
}

fn execute<C: Clock>(
    service: &mut CirculationService<C>,
    command: &Command,
) -> Result<Outcome, LibraryError> {
    match command {
        Command::AddBook {
            id,
            title,
            author,
            copies,
        } => {
            let book = Book::new(BookId::new(id)?, title, author, parse_copies("copies", copies)?);
            service.add_book(book.clone())?;
            Outcome::write(vec![format!("✅ Added book {} '{}'", book.id, book.title)], &book)
        }
        Command::AddPatron { id, name } => {
            let patron = Patron::new(PatronId::new(id)?, name);
            service.add_patron(patron.clone())?;
            Outcome::write(vec![format!("✅ Added patron {} ({})", patron.id, patron.name)], &patron)
        }
        Command::ModifyBook {
            id,
            title,
            author,
            copies,
        } => {
            let update = BookUpdate {
                title: title.clone(),
                author: author.clone(),
                copies: copies
                    .as_deref()
                    .map(|value| parse_copies("copies", value))
                    .transpose()?,
            };
            if update.is_empty() {
                return Err(LibraryError::invalid_input(
                    "modify-book",
                    id,
                    "Nothing to change; pass --title, --author or --copies",
                ));
            }
            let book = service.modify_book(&BookId::new(id)?, update)?.clone();
            Outcome::write(vec![format!("✅ Modified book {}", book.id)], &book)
        }
        Command::DeleteBook { id } => {
            let book = service.delete_book(&BookId::new(id)?)?;
            Outcome::write(vec![format!("🗑️ Deleted book {}", book.id)], &book)
        }
        Command::DeletePatron { id } => {
            let patron = service.delete_patron(&PatronId::new(id)?)?;
            Outcome::write(vec![format!("🗑️ Deleted patron {}", patron.id)], &patron)
        }
        Command::Books => {
            let books: Vec<&Book> = service.catalog().iter().collect();
            Outcome::read(books.iter().map(|book| book_line(book)).collect(), &books)
        }
        Command::Patrons => {
            let patrons: Vec<&Patron> = service.registry().iter().collect();
            let text = patrons
                .iter()
                .map(|patron| {
                    format!(
                        "{}\t{}\t{} loan(s)\tfees owed: {}",
                        patron.id,
                        patron.name,
                        patron.loans.len(),
                        service.outstanding_fees(&patron.id)
                    )
                })
                .collect();
            Outcome::read(text, &patrons)
        }
        Command::Search(SearchField { title, author }) => {
            let books = match (title, author) {
                (Some(text), _) => service.catalog().find_by_title_substring(text),
                (None, Some(text)) => service.catalog().find_by_author_substring(text),
                (None, None) => Vec::new(),
            };
            let mut text: Vec<String> = books.iter().map(|book| book_line(book)).collect();
            if text.is_empty() {
                text.push("No matching books".to_string());
            }
            Outcome::read(text, &books)
        }
        Command::Find { id } => {
            let book_id = BookId::new(id)?;
            let book = service
                .catalog()
                .find_by_id(&book_id)
                .ok_or_else(|| LibraryError::not_found("Book", &book_id))?;
            Outcome::read(vec![book_line(book)], book)
        }
        Command::Borrow { patron, book } => {
            let loan = service.borrow(&PatronId::new(patron)?, &BookId::new(book)?)?;
            Outcome::write(
                vec![format!(
                    "✅ Borrowed {} on {}. Due date: {}",
                    loan.book_id, loan.borrowed_on, loan.due_on
                )],
                &loan,
            )
        }
        Command::Return { patron, book } => {
            let outcome = service.return_book(&PatronId::new(patron)?, &BookId::new(book)?)?;
            let mut text = Vec::new();
            match (&outcome.settlement, outcome.fee) {
                (Some(record), Some(fee)) => text.push(format!(
                    "⚠️ {} is overdue by {} day(s). Fee: {} (settlement #{})",
                    outcome.book_id, outcome.days_overdue, fee, record.id
                )),
                _ => text.push(format!("✅ Returned {}", outcome.book_id)),
            }
            if let Some(next) = &outcome.next_in_line {
                let note = if outcome.settlement.is_some() {
                    "waiting on settlement"
                } else {
                    "ready"
                };
                text.push(format!("📣 Next in line for {}: {} ({})", outcome.book_id, next, note));
            }
            Outcome::write(text, &outcome)
        }
        Command::Reserve { patron, book } => {
            let availability = service.reserve(&PatronId::new(patron)?, &BookId::new(book)?)?;
            Outcome::write(
                vec![format!("✅ Reserved {}. Tentative available date: {}", book, availability)],
                &availability,
            )
        }
        Command::Reservations { patron } => {
            let statuses = service.reservations_for(&PatronId::new(patron)?)?;
            let mut text: Vec<String> = statuses
                .iter()
                .map(|status| {
                    format!(
                        "{}\t{}\tposition {}\t{}",
                        status.book_id, status.title, status.position, status.availability
                    )
                })
                .collect();
            if text.is_empty() {
                text.push("No reservations".to_string());
            }
            Outcome::read(text, &statuses)
        }
        Command::Availability { book } => {
            let availability = service.estimated_availability(&BookId::new(book)?)?;
            Outcome::read(vec![format!("{}: {}", book, availability)], &availability)
        }
        Command::Loans { patron } => {
            let patron_id = PatronId::new(patron)?;
            let loans = service.registry().active_loans(&patron_id)?;
            let mut text: Vec<String> = loans
                .iter()
                .map(|loan| format!("{}\tborrowed {}\tdue {}", loan.book_id, loan.borrowed_on, loan.due_on))
                .collect();
            text.push(format!("Fees owed: {}", service.outstanding_fees(&patron_id)));
            Outcome::read(text, &loans)
        }
        Command::Ledger => {
            let views: Vec<SettlementView> = service
                .ledger()
                .iter()
                .map(|record| SettlementView {
                    record,
                    fee: service.fee_for(record),
                })
                .collect();
            let text = views
                .iter()
                .map(|view| {
                    format!(
                        "#{}\t{}\t{}\t{} day(s)\tfee {}",
                        view.record.id,
                        view.record.patron_id,
                        view.record.book_id,
                        view.record.days_overdue,
                        view.fee
                    )
                })
                .collect();
            Outcome::read(text, &views)
        }
        Command::Settle { settlement_id } => {
            let id = settlement_id.trim().parse::<u64>().map_err(|_| {
                LibraryError::invalid_input("settlement_id", settlement_id, "Must be a positive integer")
            })?;
            let outcome = service.settle_payment(SettlementId(id))?;
            let mut text = vec![format!(
                "✅ Settlement #{} paid ({}); {} is back on the shelf",
                outcome.record.id, outcome.fee, outcome.record.book_id
            )];
            if let Some(next) = &outcome.next_in_line {
                text.push(format!("📣 Next in line for {}: {}", outcome.record.book_id, next));
            }
            Outcome::write(text, &outcome)
        }
        Command::Overdue { as_of } => {
            let as_of: NaiveDate = match as_of {
                Some(value) => parse_date("as_of", value)?,
                None => service.clock().today(),
            };
            let overdue = service.overdue_loans(as_of);
            let text = overdue
                .iter()
                .map(|(patron_id, loan)| {
                    format!(
                        "{}\t{}\tdue {}\t{} day(s) late",
                        patron_id,
                        loan.book_id,
                        loan.due_on,
                        loan.days_overdue(as_of)
                    )
                })
                .collect();
            Outcome::read(text, &overdue)
        }
    }
}

fn book_line(book: &Book) -> String {
    format!(
        "{}\t{}\t{}\tcopies: {}\twaiting: {}",
        book.id,
        book.title,
        book.author,
        book.available_copies,
        book.reservations.len()
    )
}
