//! 模擬績效指標

use rust_decimal::Decimal;
use serde::Serialize;
use sim_core::{OrderKind, OrderStatus, SupplyChainModel};

use crate::shipment::ShipmentReport;

/// 累計指標（每個時間桶結束時擷取）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationMetrics {
    buckets: usize,
    demands_shipped: usize,
    demands_late: usize,
    demands_expired: usize,
    lateness_days: i64,
    inventory_value: Decimal,
    inventory_quantity: Decimal,
    wip_quantity: Decimal,
    open_demand_count: usize,
    open_demand_quantity: Decimal,
    open_demand_value: Decimal,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記錄出貨結果：只有全數交貨的需求計入出貨數
    pub fn record_shipments(&mut self, report: &ShipmentReport) {
        for shipment in report.completed() {
            self.demands_shipped += 1;
            if shipment.is_late() {
                self.demands_late += 1;
                self.lateness_days += shipment.lateness_days;
            }
        }
        self.demands_expired += report.expired.len();
    }

    /// 擷取時間桶結束時的庫存、在製品與未交需求
    pub fn capture_bucket(&mut self, model: &SupplyChainModel) {
        self.buckets += 1;

        for buffer in model.buffers.iter().filter(|b| b.on_hand > Decimal::ZERO) {
            self.inventory_quantity += buffer.on_hand;
            self.inventory_value += buffer.inventory_value();
        }

        self.wip_quantity += model
            .orders
            .iter()
            .filter(|o| {
                o.status == OrderStatus::Confirmed
                    && matches!(o.kind, OrderKind::Manufacturing { .. })
            })
            .map(|o| o.quantity)
            .sum::<Decimal>();

        for demand in model.demands.iter().filter(|d| d.is_open()) {
            self.open_demand_count += 1;
            self.open_demand_quantity += demand.quantity;
            self.open_demand_value += demand.quantity * Self::unit_cost(model, &demand.item, demand.location.as_deref());
        }
    }

    /// 需求物料的單位成本：優先取需求地點的庫存點
    fn unit_cost(model: &SupplyChainModel, item: &str, location: Option<&str>) -> Decimal {
        location
            .and_then(|loc| model.buffers.get(item, loc))
            .or_else(|| model.buffers.iter().find(|b| b.item == item))
            .map(|b| b.unit_cost)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn buckets(&self) -> usize {
        self.buckets
    }

    /// 以實際擷取的時間桶數計算平均值
    pub fn report(&self) -> MetricsReport {
        let per_bucket = |total: Decimal| {
            if self.buckets == 0 {
                Decimal::ZERO
            } else {
                (total / Decimal::from(self.buckets)).round_dp(2)
            }
        };

        MetricsReport {
            buckets: self.buckets,
            demands_shipped: self.demands_shipped,
            demands_late: self.demands_late,
            demands_expired: self.demands_expired,
            average_lateness_days: (Decimal::from(self.lateness_days)
                / Decimal::from(self.demands_late.max(1)))
            .round_dp(2),
            average_open_demand_count: per_bucket(Decimal::from(self.open_demand_count)),
            average_open_demand_quantity: per_bucket(self.open_demand_quantity),
            average_open_demand_value: per_bucket(self.open_demand_value),
            average_inventory_quantity: per_bucket(self.inventory_quantity),
            average_inventory_value: per_bucket(self.inventory_value),
            average_wip_quantity: per_bucket(self.wip_quantity),
        }
    }
}

/// 模擬結束時輸出的平均指標
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub buckets: usize,
    pub demands_shipped: usize,
    pub demands_late: usize,
    pub demands_expired: usize,
    pub average_lateness_days: Decimal,
    pub average_open_demand_count: Decimal,
    pub average_open_demand_quantity: Decimal,
    pub average_open_demand_value: Decimal,
    pub average_inventory_quantity: Decimal,
    pub average_inventory_value: Decimal,
    pub average_wip_quantity: Decimal,
}

impl MetricsReport {
    pub fn demands_on_time(&self) -> usize {
        self.demands_shipped - self.demands_late
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Average open demands: {} for {} units with value {}",
            self.average_open_demand_count,
            self.average_open_demand_quantity,
            self.average_open_demand_value
        )?;
        writeln!(f, "Shipped {} demands", self.demands_shipped)?;
        writeln!(
            f,
            "Shipped {} demands late, average lateness {} days",
            self.demands_late, self.average_lateness_days
        )?;
        writeln!(f, "Expired {} demands", self.demands_expired)?;
        writeln!(
            f,
            "Average inventory: {} units with value {}",
            self.average_inventory_quantity, self.average_inventory_value
        )?;
        write!(f, "Average work in progress: {} units", self.average_wip_quantity)
    }
}

/// 以 trace 等級列出所有開放中的交易
pub fn trace_open_transactions(model: &SupplyChainModel) {
    if !tracing::enabled!(tracing::Level::TRACE) {
        return;
    }

    for demand in model.demands.iter().filter(|d| d.is_open()) {
        tracing::trace!(
            "需求 '{}'：{} {}@{} 到期 {}",
            demand.name,
            demand.quantity,
            demand.item,
            demand.location.as_deref().unwrap_or("-"),
            demand.due
        );
    }
    for order in model.orders_with_status(OrderStatus::Confirmed) {
        match &order.kind {
            OrderKind::Purchase { item, location, .. } => tracing::trace!(
                "採購訂單 '{}'：{} {}@{} 到貨 {}",
                order.id,
                order.quantity,
                item,
                location,
                order.end_date
            ),
            OrderKind::Distribution {
                item, destination, ..
            } => tracing::trace!(
                "調撥訂單 '{}'：{} {}@{} 到達 {}",
                order.id,
                order.quantity,
                item,
                destination,
                order.end_date
            ),
            OrderKind::Manufacturing { operation } => tracing::trace!(
                "製造訂單 '{}'：{} {} 完工 {}",
                order.id,
                order.quantity,
                operation,
                order.end_date
            ),
        }
    }
    for buffer in model.buffers.iter() {
        if buffer.is_below_minimum() {
            tracing::trace!(
                "庫存 '{} @ {}'：{}（低於最低庫存 {}）",
                buffer.item,
                buffer.location,
                buffer.on_hand,
                buffer.min_on_hand
            );
        } else if buffer.on_hand > Decimal::ZERO {
            tracing::trace!("庫存 '{} @ {}'：{}", buffer.item, buffer.location, buffer.on_hand);
        }
    }
}
