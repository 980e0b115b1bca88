use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Identifier already exists: {id}")]
    DuplicateIdentifier { id: String },

    #[error("Patron {patron_id} already holds book {book_id}")]
    AlreadyBorrowed { patron_id: String, book_id: String },

    #[error("Patron {patron_id} is already queued for book {book_id}")]
    AlreadyReserved { patron_id: String, book_id: String },

    #[error("No copies of book {book_id} are available")]
    Unavailable { book_id: String },

    #[error("Book {book_id} has {available} available copies")]
    AlreadyAvailable { book_id: String, available: u32 },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{entity} {id} is still referenced: {reason}")]
    InUse {
        entity: &'static str,
        id: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Domain,
    Input,
    Storage,
    Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LibraryError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_input(field: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. }
            | Self::DuplicateIdentifier { .. }
            | Self::AlreadyBorrowed { .. }
            | Self::AlreadyReserved { .. }
            | Self::Unavailable { .. }
            | Self::AlreadyAvailable { .. }
            | Self::InUse { .. } => ErrorCategory::Domain,
            Self::InvalidInput { .. } => ErrorCategory::Input,
            Self::IoError(_) | Self::CsvError(_) | Self::SerializationError(_) => {
                ErrorCategory::Storage
            }
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => ErrorCategory::Config,
        }
    }

    /// 業務規則拒絕屬於可恢復錯誤；存儲與配置錯誤則需要人工介入
    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Domain => ErrorSeverity::Medium,
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Config => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "Check the identifier, or list entries with `books` / `patrons`",
            Self::DuplicateIdentifier { .. } => "Choose an identifier that is not in use",
            Self::AlreadyBorrowed { .. } => "Return the current loan before borrowing again",
            Self::AlreadyReserved { .. } => "Wait for the existing reservation to come up",
            Self::Unavailable { .. } => "Reserve the book to join its waiting list",
            Self::AlreadyAvailable { .. } => "Borrow the book directly",
            Self::InvalidInput { .. } => "Correct the value and retry",
            Self::InUse { .. } => "Settle or return outstanding items first",
            Self::IoError(_) | Self::CsvError(_) => "Check the data directory and file permissions",
            Self::SerializationError(_) => "Retry without --json",
            Self::ConfigError { .. } | Self::ConfigValidationError { .. } => {
                "Fix the configuration file and retry"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
