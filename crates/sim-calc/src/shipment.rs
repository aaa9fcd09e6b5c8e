//! 客戶需求出貨
//!
//! 每個時間桶依（優先級、到期時間）處理到期的開放需求：有交貨作業者經由可行性檢查出貨，
//! 否則直接從需求地點的庫存出貨。無法出貨或部分出貨後，超過最大延遲的需求強制結案。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sim_core::{BufferTable, Demand, DemandOutcome, OperationTable, Result, SupplyChainModel};

use crate::bucketing::Bucket;
use crate::feasibility::FeasibilityChecker;
use crate::lifecycle::OrderLifecycle;

/// 單筆出貨紀錄
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub demand: String,
    pub quantity: Decimal,
    /// 出貨日（時間桶開始日）
    pub date: NaiveDate,
    /// 延遲天數（準時為 0）
    pub lateness_days: i64,
    /// 是否已全數交貨並結案
    pub closed: bool,
}

impl Shipment {
    pub fn is_late(&self) -> bool {
        self.lateness_days > 0
    }
}

/// 單一時間桶的出貨結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentReport {
    pub shipments: Vec<Shipment>,
    /// 逾期結案的需求
    pub expired: Vec<String>,
    /// 本時間桶無法出貨的需求數
    pub unshippable: usize,
}

impl ShipmentReport {
    /// 全數交貨的出貨
    pub fn completed(&self) -> impl Iterator<Item = &Shipment> {
        self.shipments.iter().filter(|s| s.closed)
    }

    /// 部分出貨
    pub fn partial(&self) -> impl Iterator<Item = &Shipment> {
        self.shipments.iter().filter(|s| !s.closed)
    }
}

/// 出貨決策
enum Decision {
    Ship(Decimal),
    Unshippable,
}

/// 客戶需求出貨
pub struct DemandShipment;

impl DemandShipment {
    /// 處理時間桶內到期的開放需求
    pub fn ship_bucket(model: &mut SupplyChainModel, bucket: &Bucket) -> Result<ShipmentReport> {
        let bucket_end = bucket.end_time();
        let mut due: Vec<usize> = model
            .demands
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_open() && d.due < bucket_end)
            .map(|(idx, _)| idx)
            .collect();
        due.sort_by(|&a, &b| {
            let (a, b) = (&model.demands[a], &model.demands[b]);
            (a.priority, a.due, &a.name).cmp(&(b.priority, b.due, &b.name))
        });

        let mut report = ShipmentReport::default();
        let mut settled = Vec::new();
        {
            let SupplyChainModel {
                demands,
                buffers,
                operations,
                ..
            } = &mut *model;

            for idx in due {
                let demand = &mut demands[idx];
                let mut decision = Self::decide(demand, buffers, operations);
                if let Decision::Ship(quantity) = decision {
                    if let Err(e) = Self::execute(demand, buffers, operations, quantity) {
                        tracing::warn!("需求 {} 無法出貨 {}：{}", demand.name, quantity, e);
                        decision = Decision::Unshippable;
                    }
                }

                match decision {
                    Decision::Ship(quantity) => {
                        let shipment = Self::record(demand, bucket, quantity)?;
                        if shipment.closed {
                            settled.push(demand.name.clone());
                        } else if Self::expire(demand, bucket)? {
                            report.expired.push(demand.name.clone());
                            settled.push(demand.name.clone());
                        }
                        report.shipments.push(shipment);
                    }
                    Decision::Unshippable => {
                        report.unshippable += 1;
                        if Self::expire(demand, bucket)? {
                            report.expired.push(demand.name.clone());
                            settled.push(demand.name.clone());
                        }
                    }
                }
            }
        }

        for name in &settled {
            OrderLifecycle::settle_delivery_orders(model, name);
        }

        Ok(report)
    }

    /// 決定本時間桶可出貨數量
    fn decide(demand: &Demand, buffers: &BufferTable, operations: &OperationTable) -> Decision {
        let min_shipment = demand.min_shipment_or_zero();

        if let Some(operation) = demand.operation.as_deref() {
            let checker = FeasibilityChecker::new(operations);
            return match checker.probe(buffers, demand.quantity, min_shipment, operation) {
                Ok(feasibility) if feasibility.is_feasible() => {
                    Decision::Ship(feasibility.quantity())
                }
                Ok(_) => Decision::Unshippable,
                Err(e) => {
                    tracing::warn!("需求 {} 的交貨作業 {} 無法檢查：{}", demand.name, operation, e);
                    Decision::Unshippable
                }
            };
        }

        let Some(location) = demand.location.as_deref() else {
            tracing::warn!("需求 {} 未指定出貨地點", demand.name);
            return Decision::Unshippable;
        };
        let on_hand = match buffers.on_hand(&demand.item, location) {
            Ok(on_hand) => on_hand,
            Err(e) => {
                tracing::warn!("需求 {} 無法出貨：{}", demand.name, e);
                return Decision::Unshippable;
            }
        };

        if on_hand <= Decimal::ZERO || on_hand < min_shipment {
            Decision::Unshippable
        } else {
            Decision::Ship(on_hand.min(demand.quantity))
        }
    }

    /// 執行出貨的物料流；失敗時庫存不變
    fn execute(
        demand: &Demand,
        buffers: &mut BufferTable,
        operations: &OperationTable,
        quantity: Decimal,
    ) -> Result<()> {
        match (demand.operation.as_deref(), demand.location.as_deref()) {
            (Some(operation), _) => {
                FeasibilityChecker::new(operations).commit(buffers, quantity, operation)?;
            }
            (None, Some(location)) => {
                buffers.adjust(&demand.item, location, -quantity)?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    /// 更新需求並產生出貨紀錄
    fn record(demand: &mut Demand, bucket: &Bucket, quantity: Decimal) -> Result<Shipment> {
        let due_date = demand.due.date();
        let lateness_days = (bucket.start - due_date).num_days().max(0);

        if quantity < demand.quantity {
            demand.reduce(quantity)?;
            tracing::debug!(
                "需求 {} 部分出貨 {}，未交 {}，延遲 {} 天",
                demand.name,
                quantity,
                demand.quantity,
                lateness_days
            );
            return Ok(Shipment {
                demand: demand.name.clone(),
                quantity,
                date: bucket.start,
                lateness_days,
                closed: false,
            });
        }

        let outcome = if bucket.start > due_date {
            DemandOutcome::DeliveredLate { date: bucket.start }
        } else {
            DemandOutcome::DeliveredOnTime { date: due_date }
        };
        demand.close(outcome)?;
        tracing::debug!("需求 {} 結案：{}", demand.name, outcome);

        Ok(Shipment {
            demand: demand.name.clone(),
            quantity,
            date: bucket.start,
            lateness_days,
            closed: true,
        })
    }

    /// 超過最後可交貨日的需求強制結案
    fn expire(demand: &mut Demand, bucket: &Bucket) -> Result<bool> {
        if !demand.is_open() || !demand.is_expired_at(bucket.end) {
            return Ok(false);
        }
        demand.close(DemandOutcome::Expired)?;
        tracing::warn!(
            "需求 {} 逾期未滿足，未交 {} 強制結案",
            demand.name,
            demand.quantity
        );
        Ok(true)
    }
}
