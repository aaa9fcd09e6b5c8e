//! 訂單模型（製造、採購、調撥）

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, SimError};

/// 訂單狀態
///
/// 狀態只能前進：proposed → confirmed → closed。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// 計劃引擎建議
    Proposed,
    /// 已下達（開始時點的物料流已執行）
    Confirmed,
    /// 已完成（結束時點的物料流已執行）
    Closed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Proposed => "proposed",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// 訂單類型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderKind {
    /// 製造訂單
    Manufacturing { operation: String },
    /// 採購訂單
    Purchase {
        item: String,
        location: String,
        #[serde(default)]
        supplier: Option<String>,
    },
    /// 調撥訂單
    Distribution {
        item: String,
        origin: String,
        destination: String,
    },
}

impl OrderKind {
    /// 簡稱（日誌用）
    pub fn code(&self) -> &'static str {
        match self {
            OrderKind::Manufacturing { .. } => "MO",
            OrderKind::Purchase { .. } => "PO",
            OrderKind::Distribution { .. } => "DO",
        }
    }
}

/// 訂單
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// 訂單ID
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// 訂單類型
    #[serde(flatten)]
    pub kind: OrderKind,

    /// 數量
    pub quantity: Decimal,

    /// 開始時間
    pub start_date: NaiveDateTime,

    /// 結束時間
    pub end_date: NaiveDateTime,

    /// 狀態
    pub status: OrderStatus,

    /// 交貨訂單所屬需求
    #[serde(default)]
    pub demand: Option<String>,
}

impl Order {
    fn new(
        kind: OrderKind,
        quantity: Decimal,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            quantity,
            start_date,
            end_date,
            status: OrderStatus::Proposed,
            demand: None,
        }
    }

    /// 創建建議製造訂單
    pub fn manufacturing(
        operation: impl Into<String>,
        quantity: Decimal,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self::new(
            OrderKind::Manufacturing {
                operation: operation.into(),
            },
            quantity,
            start_date,
            end_date,
        )
    }

    /// 創建建議採購訂單
    pub fn purchase(
        item: impl Into<String>,
        location: impl Into<String>,
        quantity: Decimal,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self::new(
            OrderKind::Purchase {
                item: item.into(),
                location: location.into(),
                supplier: None,
            },
            quantity,
            start_date,
            end_date,
        )
    }

    /// 創建建議調撥訂單
    pub fn distribution(
        item: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        quantity: Decimal,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self::new(
            OrderKind::Distribution {
                item: item.into(),
                origin: origin.into(),
                destination: destination.into(),
            },
            quantity,
            start_date,
            end_date,
        )
    }

    /// 建構器模式：設置狀態
    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// 建構器模式：設置所屬需求
    pub fn with_demand(mut self, demand: impl Into<String>) -> Self {
        self.demand = Some(demand.into());
        self
    }

    /// 建構器模式：設置供應商（僅採購訂單）
    pub fn with_supplier(mut self, name: impl Into<String>) -> Self {
        if let OrderKind::Purchase { supplier, .. } = &mut self.kind {
            *supplier = Some(name.into());
        }
        self
    }

    /// 是否為交貨訂單（由出貨邏輯處理）
    pub fn is_delivery(&self) -> bool {
        self.demand.is_some()
    }

    pub fn is_manufacturing(&self) -> bool {
        matches!(self.kind, OrderKind::Manufacturing { .. })
    }

    pub fn is_purchase(&self) -> bool {
        matches!(self.kind, OrderKind::Purchase { .. })
    }

    pub fn is_distribution(&self) -> bool {
        matches!(self.kind, OrderKind::Distribution { .. })
    }

    /// 狀態轉換（只能前進，已完成訂單不可變更）
    pub fn transition(&mut self, to: OrderStatus) -> Result<()> {
        if to <= self.status {
            return Err(SimError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
