//! 供應鏈模型（模擬讀寫的共享狀態）

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    Buffer, BufferTable, Demand, Operation, OperationTable, Order, OrderStatus, Result, SimError,
};

/// 供應鏈模型
///
/// 以 JSON 文件保存；計劃引擎與模擬器透過同一份模型交換資料。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyChainModel {
    /// 目前日期參數
    #[serde(default)]
    pub current_date: Option<NaiveDate>,

    #[serde(default)]
    pub buffers: BufferTable,

    #[serde(default)]
    pub operations: OperationTable,

    #[serde(default)]
    pub orders: Vec<Order>,

    #[serde(default)]
    pub demands: Vec<Demand>,
}

impl SupplyChainModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 字串載入
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 從 JSON 檔案載入
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SimError::Config(format!("找不到模型資料: {}", path.display())));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 寫回 JSON 檔案
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 清空後從初始資料重新載入
    pub fn reload_from_fixture(&mut self, fixture: &Path) -> Result<()> {
        let content = std::fs::read_to_string(fixture).map_err(|e| {
            SimError::Fixture(format!("{}: {}", fixture.display(), e))
        })?;
        let loaded: SupplyChainModel = serde_json::from_str(&content)
            .map_err(|e| SimError::Fixture(format!("{}: {}", fixture.display(), e)))?;

        tracing::info!(
            "載入初始資料 {}：庫存點 {} 個，作業 {} 個，訂單 {} 筆，需求 {} 筆",
            fixture.display(),
            loaded.buffers.len(),
            loaded.operations.len(),
            loaded.orders.len(),
            loaded.demands.len()
        );
        *self = loaded;
        Ok(())
    }

    /// 建構器模式：添加庫存點
    pub fn with_buffer(mut self, buffer: Buffer) -> Self {
        self.buffers.insert(buffer);
        self
    }

    /// 建構器模式：添加作業
    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operations.insert(operation);
        self
    }

    /// 建構器模式：添加訂單
    pub fn with_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// 建構器模式：添加需求
    pub fn with_demand(mut self, demand: Demand) -> Self {
        self.demands.push(demand);
        self
    }

    /// 建構器模式：設置目前日期
    pub fn with_current_date(mut self, date: NaiveDate) -> Self {
        self.current_date = Some(date);
        self
    }

    pub fn demand(&self, name: &str) -> Option<&Demand> {
        self.demands.iter().find(|d| d.name == name)
    }

    pub fn demand_mut(&mut self, name: &str) -> Result<&mut Demand> {
        self.demands
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| SimError::DemandNotFound(name.to_string()))
    }

    /// 指定狀態的訂單
    pub fn orders_with_status(&self, status: OrderStatus) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(move |o| o.status == status)
    }

    /// 以計劃引擎的新建議取代現有建議訂單；已下達與已完成的訂單保持不變
    pub fn replace_proposed_orders(&mut self, proposals: Vec<Order>) -> usize {
        self.orders.retain(|o| o.status != OrderStatus::Proposed);
        let count = proposals
            .iter()
            .filter(|o| o.status == OrderStatus::Proposed)
            .count();
        self.orders
            .extend(proposals.into_iter().filter(|o| o.status == OrderStatus::Proposed));
        count
    }

    /// 以單一交易單位執行：失敗時還原至執行前狀態
    pub fn atomic<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut SupplyChainModel) -> Result<T>,
    {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                *self = snapshot;
                Err(e)
            }
        }
    }
}
