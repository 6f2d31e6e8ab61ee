use chrono::{Local, NaiveDate};

/// 提供"今天"的日期（按天粒度）
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// 本地时区的系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// 固定日期，测试和回放用
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
