use crate::domain::model::CirculationPolicy;
use crate::utils::error::Result;
use chrono::NaiveDate;
use std::cell::Cell;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn data_dir(&self) -> &str;
    fn books_file(&self) -> &str;
    fn patrons_file(&self) -> &str;
    fn settlements_file(&self) -> &str;
    fn reservations_file(&self) -> &str;
    fn policy(&self) -> CirculationPolicy;
}

/// Source of "today" for the circulation rules.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

/// 可手動調整的時鐘，用於測試與重播
#[derive(Debug, Clone)]
pub struct ManualClock {
    today: Cell<NaiveDate>,
}

impl ManualClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Cell::new(today),
        }
    }

    pub fn set(&self, today: NaiveDate) {
        self.today.set(today);
    }

    pub fn advance_days(&self, days: u64) {
        self.today.set(self.today.get() + chrono::Days::new(days));
    }
}

impl Clock for ManualClock {
    fn today(&self) -> NaiveDate {
        self.today.get()
    }
}
