//! 庫存點模型

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// 庫存點（某物料於某地點的存放位置）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffer {
    /// 物料ID
    pub item: String,

    /// 地點
    pub location: String,

    /// 現有庫存（可為負，代表欠料）
    pub on_hand: Decimal,

    /// 單位成本
    #[serde(default)]
    pub unit_cost: Decimal,

    /// 最低庫存目標
    #[serde(default)]
    pub min_on_hand: Decimal,
}

impl Buffer {
    /// 創建新的庫存點
    pub fn new(item: impl Into<String>, location: impl Into<String>, on_hand: Decimal) -> Self {
        Self {
            item: item.into(),
            location: location.into(),
            on_hand,
            unit_cost: Decimal::ZERO,
            min_on_hand: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置單位成本
    pub fn with_unit_cost(mut self, unit_cost: Decimal) -> Self {
        self.unit_cost = unit_cost;
        self
    }

    /// 建構器模式：設置最低庫存目標
    pub fn with_min_on_hand(mut self, min_on_hand: Decimal) -> Self {
        self.min_on_hand = min_on_hand;
        self
    }

    /// 是否為指定物料與地點
    pub fn matches(&self, item: &str, location: &str) -> bool {
        self.item == item && self.location == location
    }

    /// 庫存價值（僅計算正庫存）
    pub fn inventory_value(&self) -> Decimal {
        if self.on_hand > Decimal::ZERO {
            self.on_hand * self.unit_cost
        } else {
            Decimal::ZERO
        }
    }

    /// 檢查庫存是否低於最低庫存目標
    pub fn is_below_minimum(&self) -> bool {
        self.on_hand < self.min_on_hand
    }
}

/// 庫存點表
///
/// 以 (物料, 地點) 為鍵；持有 `&mut BufferTable` 即代表對所有庫存點的獨佔寫入權。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BufferTable(Vec<Buffer>);

impl BufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新增或覆蓋庫存點
    pub fn insert(&mut self, buffer: Buffer) {
        match self
            .0
            .iter_mut()
            .find(|b| b.matches(&buffer.item, &buffer.location))
        {
            Some(existing) => *existing = buffer,
            None => self.0.push(buffer),
        }
    }

    pub fn get(&self, item: &str, location: &str) -> Option<&Buffer> {
        self.0.iter().find(|b| b.matches(item, location))
    }

    pub fn get_mut(&mut self, item: &str, location: &str) -> Option<&mut Buffer> {
        self.0.iter_mut().find(|b| b.matches(item, location))
    }

    /// 查找庫存點，找不到時回傳錯誤
    pub fn require(&self, item: &str, location: &str) -> Result<&Buffer> {
        self.get(item, location)
            .ok_or_else(|| SimError::BufferNotFound {
                item: item.to_string(),
                location: location.to_string(),
            })
    }

    /// 現有庫存，找不到時回傳錯誤
    pub fn on_hand(&self, item: &str, location: &str) -> Result<Decimal> {
        self.require(item, location).map(|b| b.on_hand)
    }

    /// 調整現有庫存，回傳調整後數量
    pub fn adjust(&mut self, item: &str, location: &str, delta: Decimal) -> Result<Decimal> {
        let buffer = self
            .get_mut(item, location)
            .ok_or_else(|| SimError::BufferNotFound {
                item: item.to_string(),
                location: location.to_string(),
            })?;
        buffer.on_hand += delta;
        Ok(buffer.on_hand)
    }

    pub fn contains(&self, item: &str, location: &str) -> bool {
        self.get(item, location).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Buffer> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Buffer> for BufferTable {
    fn from_iter<T: IntoIterator<Item = Buffer>>(iter: T) -> Self {
        let mut table = BufferTable::new();
        for buffer in iter {
            table.insert(buffer);
        }
        table
    }
}
