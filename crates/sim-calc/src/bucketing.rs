//! 時間分桶

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use sim_core::{Result, SimError};

/// 模擬時間桶 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// 序號（從 0 開始）
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Bucket {
    pub fn new(index: usize, start: NaiveDate, end: NaiveDate) -> Self {
        Self { index, start, end }
    }

    /// 開始時點（當日零時）
    pub fn start_time(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// 結束時點（當日零時）
    pub fn end_time(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN)
    }

    /// 天數
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// 時間分桶計算器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucketer {
    horizon_days: u32,
    step_days: u32,
}

impl TimeBucketer {
    /// 創建分桶計算器（時界與步長皆須為正）
    pub fn new(horizon_days: u32, step_days: u32) -> Result<Self> {
        if horizon_days == 0 {
            return Err(SimError::Config(format!("無效的模擬時界: {}", horizon_days)));
        }
        if step_days == 0 {
            return Err(SimError::Config(format!("無效的時間步長: {}", step_days)));
        }
        Ok(Self {
            horizon_days,
            step_days,
        })
    }

    /// 從起始日期產生時間桶
    ///
    /// 覆蓋 `[start, start + horizon]`；最後一個桶截至時界邊界。
    pub fn buckets(&self, start: NaiveDate) -> Result<Vec<Bucket>> {
        let horizon_end = start
            .checked_add_signed(Duration::days(i64::from(self.horizon_days)))
            .ok_or_else(|| SimError::Config(format!("模擬時界超出日期範圍: {}", start)))?;

        let mut buckets = Vec::new();
        let mut current = start;

        while current < horizon_end {
            let next = current
                .checked_add_signed(Duration::days(i64::from(self.step_days)))
                .map(|d| d.min(horizon_end))
                .unwrap_or(horizon_end);
            buckets.push(Bucket::new(buckets.len(), current, next));
            current = next;
        }

        Ok(buckets)
    }

    pub fn horizon_days(&self) -> u32 {
        self.horizon_days
    }

    pub fn step_days(&self) -> u32 {
        self.step_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn test_daily_buckets() {
        let buckets = TimeBucketer::new(5, 1).unwrap().buckets(date(10, 1)).unwrap();

        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets[0], Bucket::new(0, date(10, 1), date(10, 2)));
        assert_eq!(buckets[4], Bucket::new(4, date(10, 5), date(10, 6)));
    }

    #[test]
    fn test_last_bucket_is_clipped() {
        let buckets = TimeBucketer::new(10, 7).unwrap().buckets(date(10, 1)).unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].len_days(), 7);
        assert_eq!(buckets[1], Bucket::new(1, date(10, 8), date(10, 11)));
    }

    #[test]
    fn test_horizon_shorter_than_step() {
        let buckets = TimeBucketer::new(3, 7).unwrap().buckets(date(10, 1)).unwrap();

        assert_eq!(buckets, vec![Bucket::new(0, date(10, 1), date(10, 4))]);
    }

    #[rstest]
    #[case(60, 1, 60)]
    #[case(28, 7, 4)]
    #[case(30, 7, 5)]
    #[case(1, 1, 1)]
    fn test_bucket_count(#[case] horizon: u32, #[case] step: u32, #[case] expected: usize) {
        let buckets = TimeBucketer::new(horizon, step)
            .unwrap()
            .buckets(date(1, 1))
            .unwrap();

        assert_eq!(buckets.len(), expected);
        // 桶彼此相接且不重疊
        for pair in buckets.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert_eq!(buckets.last().unwrap().end, date(1, 1) + Duration::days(horizon as i64));
    }

    #[test]
    fn test_buckets_are_repeatable() {
        let bucketer = TimeBucketer::new(30, 7).unwrap();
        assert_eq!(
            bucketer.buckets(date(3, 1)).unwrap(),
            bucketer.buckets(date(3, 1)).unwrap()
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(TimeBucketer::new(0, 1).is_err());
        assert!(TimeBucketer::new(10, 0).is_err());
    }
}
