use crate::utils::error::{LibraryError, Result};
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 標識符中不可出現的字元（借閱編碼使用的分隔符）
const RESERVED_ID_CHARS: [char; 2] = [',', ';'];

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(LibraryError::ConfigValidationError {
            field: field_name.to_string(),
            message: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(LibraryError::ConfigValidationError {
            field: field_name.to_string(),
            message: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: u64, min_value: u64) -> Result<()> {
    if value < min_value {
        return Err(LibraryError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!("Value {} must be at least {}", value, min_value),
        });
    }
    Ok(())
}

pub fn validate_at_most(field_name: &str, value: u64, max_value: u64) -> Result<()> {
    if value > max_value {
        return Err(LibraryError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!("Value {} must be at most {}", value, max_value),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(LibraryError::ConfigValidationError {
            field: field_name.to_string(),
            message: format!(
                "Unsupported value '{}'. Allowed values: {}",
                value,
                allowed.join(", ")
            ),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LibraryError::invalid_input(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// 驗證書籍或讀者標識符
pub fn validate_identifier(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;

    if let Some(c) = value.chars().find(|c| RESERVED_ID_CHARS.contains(c)) {
        return Err(LibraryError::invalid_input(
            field_name,
            value,
            format!("Identifier cannot contain '{}'", c),
        ));
    }
    Ok(())
}

pub fn parse_date(field_name: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|e| {
        LibraryError::invalid_input(field_name, value, format!("Expected YYYY-MM-DD: {}", e))
    })
}

pub fn parse_copies(field_name: &str, value: &str) -> Result<u32> {
    value.trim().parse::<u32>().map_err(|_| {
        LibraryError::invalid_input(field_name, value, "Must be a non-negative integer")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("storage.data_dir", "./data").is_ok());
        assert!(validate_path("storage.data_dir", "").is_err());
        assert!(validate_path("storage.data_dir", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("circulation.loan_period_days", 14, 1).is_ok());
        assert!(validate_positive_number("circulation.loan_period_days", 0, 1).is_err());
        assert!(validate_at_most("circulation.loan_period_days", 3650, 3650).is_ok());
        assert!(validate_at_most("circulation.loan_period_days", 3651, 3650).is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("book_id", "B001").is_ok());
        assert!(validate_identifier("book_id", "   ").is_err());
        assert!(validate_identifier("book_id", "B0,01").is_err());
        assert!(validate_identifier("book_id", "B0;01").is_err());
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("borrowed", "2024-03-01").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(matches!(
            parse_date("borrowed", "03/01/2024"),
            Err(LibraryError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_parse_copies() {
        assert_eq!(parse_copies("copies", " 3 ").unwrap(), 3);
        assert!(parse_copies("copies", "-1").is_err());
        assert!(parse_copies("copies", "three").is_err());
    }
}
