use crate::domain::model::{
    CirculationPolicy, DEFAULT_FEE_PER_DAY, DEFAULT_LOAN_PERIOD_DAYS, MAX_LOAN_PERIOD_DAYS,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{LibraryError, Result};
use crate::utils::validation::{
    validate_at_most, validate_one_of, validate_path, validate_positive_number, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub library: LibrarySection,
    pub circulation: CirculationSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySection {
    pub name: String,
}

impl Default for LibrarySection {
    fn default() -> Self {
        Self {
            name: "Library".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CirculationSection {
    pub loan_period_days: u32,
    pub fee_per_day: u64,
}

impl Default for CirculationSection {
    fn default() -> Self {
        Self {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            fee_per_day: DEFAULT_FEE_PER_DAY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub data_dir: String,
    pub books_file: String,
    pub patrons_file: String,
    pub settlements_file: String,
    pub reservations_file: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            books_file: "books.csv".to_string(),
            patrons_file: "patrons.csv".to_string(),
            settlements_file: "settlements.csv".to_string(),
            reservations_file: "reservations.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            format: "compact".to_string(),
        }
    }
}

impl LibraryConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| LibraryError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LIBRARY_DATA_DIR})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| LibraryError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number(
            "circulation.loan_period_days",
            u64::from(self.circulation.loan_period_days),
            1,
        )?;
        validate_at_most(
            "circulation.loan_period_days",
            u64::from(self.circulation.loan_period_days),
            u64::from(MAX_LOAN_PERIOD_DAYS),
        )?;

        validate_path("storage.data_dir", &self.storage.data_dir)?;
        validate_path("storage.books_file", &self.storage.books_file)?;
        validate_path("storage.patrons_file", &self.storage.patrons_file)?;
        validate_path("storage.settlements_file", &self.storage.settlements_file)?;
        validate_path("storage.reservations_file", &self.storage.reservations_file)?;

        validate_one_of("logging.format", &self.logging.format, &LOG_FORMATS)?;

        Ok(())
    }

    pub fn json_logging(&self) -> bool {
        self.logging.format == "json"
    }
}

impl ConfigProvider for LibraryConfig {
    fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    fn books_file(&self) -> &str {
        &self.storage.books_file
    }

    fn patrons_file(&self) -> &str {
        &self.storage.patrons_file
    }

    fn settlements_file(&self) -> &str {
        &self.storage.settlements_file
    }

    fn reservations_file(&self) -> &str {
        &self.storage.reservations_file
    }

    fn policy(&self) -> CirculationPolicy {
        CirculationPolicy {
            loan_period_days: self.circulation.loan_period_days,
            fee_per_day: self.circulation.fee_per_day,
        }
    }
}

impl Validate for LibraryConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
