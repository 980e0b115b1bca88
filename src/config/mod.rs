pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use args::{CliConfig, Command, SearchField};

#[cfg(feature = "cli")]
mod args {
    use clap::{Args, Parser, Subcommand};

    #[derive(Debug, Clone, Parser)]
    #[command(name = "small-library")]
    #[command(about = "Library catalog and circulation tool")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = "library.toml")]
        pub config: String,

        /// Override the data directory from the config file
        #[arg(long)]
        pub data_dir: Option<String>,

        /// Run with librarian privileges
        #[arg(long)]
        pub admin: bool,

        /// Render results as JSON
        #[arg(long)]
        pub json: bool,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Subcommand)]
    pub enum Command {
        /// Add a book to the catalog
        AddBook {
            id: String,
            title: String,
            author: String,
            copies: String,
        },
        /// Register a patron
        AddPatron { id: String, name: String },
        /// Change a book's title, author or copy count
        ModifyBook {
            id: String,
            #[arg(long)]
            title: Option<String>,
            #[arg(long)]
            author: Option<String>,
            #[arg(long)]
            copies: Option<String>,
        },
        DeleteBook { id: String },
        DeletePatron { id: String },
        /// List every book
        Books,
        /// List every patron
        Patrons,
        /// Case-insensitive substring search
        Search(SearchField),
        /// Exact lookup by book identifier
        Find { id: String },
        Borrow { patron: String, book: String },
        Return { patron: String, book: String },
        Reserve { patron: String, book: String },
        /// Books a patron is waiting for, with queue position and estimate
        Reservations { patron: String },
        /// Estimated date a book comes back
        Availability { book: String },
        /// Active loans and outstanding fees of a patron
        Loans { patron: String },
        /// Unpaid overdue settlements
        Ledger,
        /// Mark a settlement as paid and release its copy
        Settle { settlement_id: String },
        /// Active loans past their due date
        Overdue {
            /// Report date (YYYY-MM-DD), defaults to today
            #[arg(long)]
            as_of: Option<String>,
        },
    }

    #[derive(Debug, Clone, Args)]
    #[group(required = true, multiple = false)]
    pub struct SearchField {
        #[arg(long)]
        pub title: Option<String>,
        #[arg(long)]
        pub author: Option<String>,
    }

    impl Command {
        pub fn requires_admin(&self) -> bool {
            matches!(
                self,
                Command::AddBook { .. }
                    | Command::AddPatron { .. }
                    | Command::ModifyBook { .. }
                    | Command::DeleteBook { .. }
                    | Command::DeletePatron { .. }
                    | Command::Patrons
                    | Command::Ledger
                    | Command::Settle { .. }
                    | Command::Overdue { .. }
            )
        }
    }

}
