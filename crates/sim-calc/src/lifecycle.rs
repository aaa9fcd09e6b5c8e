//! 訂單生命週期：proposed → confirmed → closed
//!
//! 每次狀態轉換依作業物料流（或採購/調撥的地點）調整庫存。找不到庫存點或作業的
//! 訂單會被跳過並保留原狀態，於之後的時間桶重試。

use rust_decimal::Decimal;
use sim_core::{Order, OrderKind, OrderStatus, OperationTable, BufferTable, Result, SupplyChainModel};

use crate::bucketing::Bucket;

/// 庫存變動：(物料, 地點, 數量)
type StockDelta = (String, String, Decimal);

/// 單一步驟的轉換統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionReport {
    /// 完成轉換的訂單數
    pub transitioned: usize,
    /// 因資料問題跳過的訂單數
    pub skipped: usize,
}

/// 訂單生命週期
pub struct OrderLifecycle;

impl OrderLifecycle {
    /// 下達時間桶內（含先前未下達）的建議採購訂單
    pub fn create_purchase_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_purchase() && Self::starts_by(o, bucket),
            OrderStatus::Confirmed,
            |_, _| Ok(Vec::new()),
        )
    }

    /// 下達建議製造訂單：執行開始時點的物料流
    pub fn create_manufacturing_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_manufacturing() && Self::starts_by(o, bucket),
            OrderStatus::Confirmed,
            |order, operations| Self::operation_deltas(order, operations, true),
        )
    }

    /// 下達建議調撥訂單：從來源地點扣除數量
    pub fn create_distribution_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_distribution() && Self::starts_by(o, bucket),
            OrderStatus::Confirmed,
            |order, _| match &order.kind {
                OrderKind::Distribution { item, origin, .. } => {
                    Ok(vec![(item.clone(), origin.clone(), -order.quantity)])
                }
                _ => Ok(Vec::new()),
            },
        )
    }

    /// 採購收貨：目的地點增加訂單數量
    pub fn receive_purchase_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_purchase() && Self::ends_by(o, bucket),
            OrderStatus::Closed,
            |order, _| match &order.kind {
                OrderKind::Purchase { item, location, .. } => {
                    Ok(vec![(item.clone(), location.clone(), order.quantity)])
                }
                _ => Ok(Vec::new()),
            },
        )
    }

    /// 調撥收貨：目的地點增加訂單數量
    pub fn receive_distribution_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_distribution() && Self::ends_by(o, bucket),
            OrderStatus::Closed,
            |order, _| match &order.kind {
                OrderKind::Distribution {
                    item, destination, ..
                } => Ok(vec![(item.clone(), destination.clone(), order.quantity)]),
                _ => Ok(Vec::new()),
            },
        )
    }

    /// 完工製造訂單：執行結束時點的物料流
    pub fn finish_manufacturing_orders(
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        Self::sweep(
            model,
            |o| o.is_manufacturing() && Self::ends_by(o, bucket),
            OrderStatus::Closed,
            |order, operations| Self::operation_deltas(order, operations, false),
        )
    }

    /// 需求結案時關閉其交貨訂單（物料流已由出貨執行）
    pub fn settle_delivery_orders(model: &mut SupplyChainModel, demand: &str) -> usize {
        let mut settled = 0;
        for order in model
            .orders
            .iter_mut()
            .filter(|o| o.demand.as_deref() == Some(demand) && o.status != OrderStatus::Closed)
        {
            order.status = OrderStatus::Closed;
            settled += 1;
        }
        if settled > 0 {
            tracing::debug!("需求 {} 結案，關閉交貨訂單 {} 筆", demand, settled);
        }
        settled
    }

    fn starts_by(order: &Order, bucket: &Bucket) -> bool {
        order.status == OrderStatus::Proposed && order.start_date <= bucket.end_time()
    }

    fn ends_by(order: &Order, bucket: &Bucket) -> bool {
        order.status == OrderStatus::Confirmed && order.end_date <= bucket.end_time()
    }

    /// 製造訂單在作業開始或結束時點的庫存變動
    fn operation_deltas(
        order: &Order,
        operations: &OperationTable,
        at_start: bool,
    ) -> Result<Vec<StockDelta>> {
        let OrderKind::Manufacturing { operation } = &order.kind else {
            return Ok(Vec::new());
        };
        let oper = operations.require(operation)?;
        let Some(location) = oper.location.as_deref() else {
            return Ok(Vec::new());
        };

        Ok(oper
            .materials
            .iter()
            .filter(|m| m.flow_type.at_start() == at_start)
            .map(|m| (m.item.clone(), location.to_string(), m.delta(order.quantity)))
            .collect())
    }

    /// 對符合條件的非交貨訂單執行狀態轉換
    fn sweep<S, E>(
        model: &mut SupplyChainModel,
        select: S,
        to: OrderStatus,
        effects: E,
    ) -> Result<TransitionReport>
    where
        S: Fn(&Order) -> bool,
        E: Fn(&Order, &OperationTable) -> Result<Vec<StockDelta>>,
    {
        let SupplyChainModel {
            orders,
            buffers,
            operations,
            ..
        } = model;

        let mut report = TransitionReport::default();
        for order in orders.iter_mut().filter(|o| !o.is_delivery() && select(o)) {
            let deltas = match effects(order, operations)
                .and_then(|deltas| Self::ensure_buffers(buffers, deltas))
            {
                Ok(deltas) => deltas,
                Err(e) => {
                    tracing::warn!(
                        "{} {} 無法轉為 {}，保留為 {}：{}",
                        order.kind.code(),
                        order.id,
                        to,
                        order.status,
                        e
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            for (item, location, delta) in &deltas {
                buffers.adjust(item, location, *delta)?;
            }
            order.transition(to)?;
            report.transitioned += 1;

            tracing::debug!(
                "{} {} 數量 {} 轉為 {}",
                order.kind.code(),
                order.id,
                order.quantity,
                to
            );
        }

        Ok(report)
    }

    fn ensure_buffers(buffers: &BufferTable, deltas: Vec<StockDelta>) -> Result<Vec<StockDelta>> {
        for (item, location, _) in &deltas {
            buffers.require(item, location)?;
        }
        Ok(deltas)
    }
}
