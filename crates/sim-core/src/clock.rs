//! 模擬時鐘

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// 模擬時鐘
///
/// 持有模擬中的「目前日期」。時鐘只會前進，由驅動器在每個時間桶開始時推進，
/// 並以值傳遞給計劃引擎與各模擬步驟。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationClock {
    current_date: NaiveDate,
}

impl SimulationClock {
    /// 以起始日期創建時鐘
    pub fn new(current_date: NaiveDate) -> Self {
        Self { current_date }
    }

    /// 目前日期
    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    /// 目前時點（當日零時）
    pub fn now(&self) -> NaiveDateTime {
        self.current_date.and_time(NaiveTime::MIN)
    }

    /// 推進時鐘至指定日期
    pub fn advance_to(&mut self, date: NaiveDate) -> Result<()> {
        if date < self.current_date {
            return Err(SimError::Config(format!(
                "模擬時鐘不可倒退：{} -> {}",
                self.current_date, date
            )));
        }
        self.current_date = date;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_clock() {
        let start = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        let mut clock = SimulationClock::new(start);

        let next = NaiveDate::from_ymd_opt(2025, 10, 13).unwrap();
        clock.advance_to(next).unwrap();
        assert_eq!(clock.current_date(), next);
        assert_eq!(clock.now(), next.and_hms_opt(0, 0, 0).unwrap());

        // 同一天可重複設定
        assert!(clock.advance_to(next).is_ok());
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut clock = SimulationClock::new(NaiveDate::from_ymd_opt(2025, 10, 13).unwrap());
        let earlier = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();

        assert!(clock.advance_to(earlier).is_err());
        assert_eq!(clock.current_date(), NaiveDate::from_ymd_opt(2025, 10, 13).unwrap());
    }
}
