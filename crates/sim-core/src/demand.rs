//! 客戶需求模型

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// 需求狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandStatus {
    Open,
    Closed,
}

/// 需求結案原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum DemandOutcome {
    /// 準時交貨
    DeliveredOnTime { date: NaiveDate },
    /// 延遲交貨
    DeliveredLate { date: NaiveDate },
    /// 逾期未滿足
    Expired,
}

impl std::fmt::Display for DemandOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DemandOutcome::DeliveredOnTime { date } => write!(f, "delivered on time on {}", date),
            DemandOutcome::DeliveredLate { date } => write!(f, "delivered late on {}", date),
            DemandOutcome::Expired => write!(f, "demand unsatisfied and expired"),
        }
    }
}

/// 客戶需求（銷售訂單）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    /// 需求名稱（唯一）
    pub name: String,

    /// 物料ID
    pub item: String,

    /// 出貨地點
    #[serde(default)]
    pub location: Option<String>,

    /// 未交數量（部分出貨後遞減）
    pub quantity: Decimal,

    /// 到期時間
    pub due: NaiveDateTime,

    /// 優先級（數字越小越優先）
    #[serde(default)]
    pub priority: i32,

    /// 最小出貨量
    #[serde(default)]
    pub min_shipment: Option<Decimal>,

    /// 最大允許延遲（秒）
    #[serde(default)]
    pub max_lateness_secs: Option<i64>,

    /// 指定的交貨作業
    #[serde(default)]
    pub operation: Option<String>,

    /// 狀態
    pub status: DemandStatus,

    /// 結案原因
    #[serde(default)]
    pub outcome: Option<DemandOutcome>,
}

impl Demand {
    /// 創建新的開放需求
    pub fn new(
        name: impl Into<String>,
        item: impl Into<String>,
        quantity: Decimal,
        due: NaiveDateTime,
    ) -> Self {
        Self {
            name: name.into(),
            item: item.into(),
            location: None,
            quantity,
            due,
            priority: 0,
            min_shipment: None,
            max_lateness_secs: None,
            operation: None,
            status: DemandStatus::Open,
            outcome: None,
        }
    }

    /// 建構器模式：設置出貨地點
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：設置最小出貨量
    pub fn with_min_shipment(mut self, min_shipment: Decimal) -> Self {
        self.min_shipment = Some(min_shipment);
        self
    }

    /// 建構器模式：設置最大允許延遲
    pub fn with_max_lateness(mut self, max_lateness: Duration) -> Self {
        self.max_lateness_secs = Some(max_lateness.num_seconds());
        self
    }

    /// 建構器模式：設置交貨作業
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == DemandStatus::Open
    }

    /// 最小出貨量（未設置時為 0）
    pub fn min_shipment_or_zero(&self) -> Decimal {
        self.min_shipment.unwrap_or(Decimal::ZERO)
    }

    pub fn max_lateness(&self) -> Option<Duration> {
        self.max_lateness_secs.map(Duration::seconds)
    }

    /// 最後可交貨時點
    pub fn deadline(&self) -> Option<NaiveDateTime> {
        self.max_lateness()
            .and_then(|lateness| self.due.checked_add_signed(lateness))
    }

    /// 在 `bucket_end` 時是否已超過最後可交貨日
    pub fn is_expired_at(&self, bucket_end: NaiveDate) -> bool {
        self.deadline()
            .map(|deadline| deadline.date() <= bucket_end)
            .unwrap_or(false)
    }

    /// 部分出貨：遞減未交數量
    pub fn reduce(&mut self, shipped: Decimal) -> Result<()> {
        if !self.is_open() {
            return Err(SimError::InvalidTransition {
                from: "closed".to_string(),
                to: "closed".to_string(),
            });
        }
        if shipped <= Decimal::ZERO || shipped > self.quantity {
            return Err(SimError::Other(format!(
                "需求 {} 出貨數量 {} 超出範圍（未交 {}）",
                self.name, shipped, self.quantity
            )));
        }
        self.quantity -= shipped;
        Ok(())
    }

    /// 結案（每筆需求只能結案一次）
    pub fn close(&mut self, outcome: DemandOutcome) -> Result<()> {
        if !self.is_open() {
            return Err(SimError::InvalidTransition {
                from: "closed".to_string(),
                to: "closed".to_string(),
            });
        }
        self.status = DemandStatus::Closed;
        self.outcome = Some(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_create_demand() {
        let demand = Demand::new("SO-001", "BIKE-001", Decimal::from(100), due())
            .with_location("DC")
            .with_priority(2)
            .with_min_shipment(Decimal::from(20));

        assert_eq!(demand.item, "BIKE-001");
        assert_eq!(demand.priority, 2);
        assert_eq!(demand.min_shipment_or_zero(), Decimal::from(20));
        assert!(demand.is_open());
        assert!(demand.deadline().is_none());
    }

    #[test]
    fn test_expiry() {
        let demand = Demand::new("SO-002", "BIKE-001", Decimal::from(10), due())
            .with_max_lateness(Duration::days(30));

        assert!(!demand.is_expired_at(NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()));
        assert!(demand.is_expired_at(NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()));
    }

    #[test]
    fn test_close_only_once() {
        let mut demand = Demand::new("SO-003", "BIKE-001", Decimal::from(10), due());
        demand.close(DemandOutcome::Expired).unwrap();

        assert_eq!(demand.status, DemandStatus::Closed);
        assert!(demand.close(DemandOutcome::Expired).is_err());
        assert_eq!(demand.outcome.unwrap().to_string(), "demand unsatisfied and expired");
    }

    #[test]
    fn test_reduce_quantity() {
        let mut demand = Demand::new("SO-004", "BIKE-001", Decimal::from(60), due());
        demand.reduce(Decimal::from(25)).unwrap();
        assert_eq!(demand.quantity, Decimal::from(35));

        // 數量只能遞減
        assert!(demand.reduce(Decimal::from(-5)).is_err());
        assert!(demand.reduce(Decimal::from(50)).is_err());
        assert_eq!(demand.quantity, Decimal::from(35));
    }
}
