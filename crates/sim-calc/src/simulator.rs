//! 模擬策略
//!
//! `Simulator` 定義每個時間桶依序執行的步驟；預設實作委派給訂單生命週期與需求出貨。
//! 策略依 `SimulatorKind` 由 [`build_simulator`] 選取。

use chrono::{Duration, NaiveDate, NaiveTime};
use sim_core::{
    Demand, DemandTemplate, Result, SimError, SimulationConfig, SimulatorKind, SupplyChainModel,
};

use crate::bucketing::Bucket;
use crate::lifecycle::{OrderLifecycle, TransitionReport};
use crate::metrics::{self, SimulationMetrics};
use crate::shipment::{DemandShipment, ShipmentReport};

/// 單一時間桶的模擬步驟
pub trait Simulator {
    /// 策略名稱
    fn name(&self) -> &str;

    fn metrics(&self) -> &SimulationMetrics;

    fn metrics_mut(&mut self) -> &mut SimulationMetrics;

    /// 時間桶開始
    fn start_bucket(&mut self, _model: &mut SupplyChainModel, bucket: &Bucket) -> Result<()> {
        tracing::debug!("時間桶 {} 開始", bucket);
        Ok(())
    }

    /// 產生新的客戶需求，回傳新增筆數
    fn generate_customer_demand(
        &mut self,
        _model: &mut SupplyChainModel,
        _bucket: &Bucket,
    ) -> Result<usize> {
        Ok(0)
    }

    fn create_purchase_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::create_purchase_orders(model, bucket)
    }

    fn create_manufacturing_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::create_manufacturing_orders(model, bucket)
    }

    fn create_distribution_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::create_distribution_orders(model, bucket)
    }

    fn receive_purchase_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::receive_purchase_orders(model, bucket)
    }

    fn receive_distribution_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::receive_distribution_orders(model, bucket)
    }

    fn finish_manufacturing_orders(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<TransitionReport> {
        OrderLifecycle::finish_manufacturing_orders(model, bucket)
    }

    /// 出貨並記錄交貨指標
    fn ship_customer_demand(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<ShipmentReport> {
        let report = DemandShipment::ship_bucket(model, bucket)?;
        self.metrics_mut().record_shipments(&report);
        Ok(report)
    }

    /// 時間桶結束：擷取指標
    fn end_bucket(&mut self, model: &mut SupplyChainModel, bucket: &Bucket) -> Result<()> {
        self.metrics_mut().capture_bucket(model);
        metrics::trace_open_transactions(model);
        tracing::debug!("時間桶 {} 結束", bucket);
        Ok(())
    }
}

/// 預設策略：只執行既有的開放需求
#[derive(Debug, Default)]
pub struct DefaultSimulator {
    metrics: SimulationMetrics,
}

impl DefaultSimulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Simulator for DefaultSimulator {
    fn name(&self) -> &str {
        "default"
    }

    fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    fn metrics_mut(&mut self) -> &mut SimulationMetrics {
        &mut self.metrics
    }
}

/// 週期性需求策略：依樣板定期產生客戶需求
#[derive(Debug)]
pub struct RecurringDemandSimulator {
    templates: Vec<DemandTemplate>,
    /// 各樣板下一次產生需求的日期
    next_release: Vec<Option<NaiveDate>>,
    /// 已使用的需求編號
    demand_number: Option<usize>,
    metrics: SimulationMetrics,
}

impl RecurringDemandSimulator {
    pub fn new(templates: Vec<DemandTemplate>) -> Result<Self> {
        if templates.is_empty() {
            return Err(SimError::Config(
                "週期性需求模擬缺少需求樣板".to_string(),
            ));
        }
        for template in &templates {
            template.validate()?;
        }
        Ok(Self {
            next_release: vec![None; templates.len()],
            templates,
            demand_number: None,
            metrics: SimulationMetrics::new(),
        })
    }

    fn next_name(&mut self, model: &SupplyChainModel) -> String {
        let mut number = self.demand_number.unwrap_or(model.demands.len());
        loop {
            number += 1;
            let name = format!("Demand #{}", number);
            if model.demand(&name).is_none() {
                self.demand_number = Some(number);
                return name;
            }
        }
    }

    fn build_demand(name: String, template: &DemandTemplate, released: NaiveDate) -> Demand {
        let due = (released + Duration::days(i64::from(template.due_offset_days)))
            .and_time(NaiveTime::MIN);
        let mut demand = Demand::new(name, template.item.clone(), template.quantity, due)
            .with_location(template.location.clone())
            .with_priority(template.priority);
        if let Some(min_shipment) = template.min_shipment {
            demand = demand.with_min_shipment(min_shipment);
        }
        if let Some(days) = template.max_lateness_days {
            demand = demand.with_max_lateness(Duration::days(i64::from(days)));
        }
        demand
    }
}

impl Simulator for RecurringDemandSimulator {
    fn name(&self) -> &str {
        "recurring_demand"
    }

    fn metrics(&self) -> &SimulationMetrics {
        &self.metrics
    }

    fn metrics_mut(&mut self) -> &mut SimulationMetrics {
        &mut self.metrics
    }

    fn generate_customer_demand(
        &mut self,
        model: &mut SupplyChainModel,
        bucket: &Bucket,
    ) -> Result<usize> {
        let mut created = 0;
        for idx in 0..self.templates.len() {
            let mut release = self.next_release[idx].unwrap_or(bucket.start);
            let interval = Duration::days(i64::from(self.templates[idx].interval_days));

            while release < bucket.end {
                let name = self.next_name(model);
                let demand = Self::build_demand(name, &self.templates[idx], release);
                tracing::debug!(
                    "新增需求 {}：{} {}@{} 到期 {}",
                    demand.name,
                    demand.quantity,
                    demand.item,
                    self.templates[idx].location,
                    demand.due
                );
                model.demands.push(demand);
                created += 1;
                release += interval;
            }
            self.next_release[idx] = Some(release);
        }
        Ok(created)
    }
}

/// 依配置建立模擬策略
pub fn build_simulator(config: &SimulationConfig) -> Result<Box<dyn Simulator>> {
    match config.simulator {
        SimulatorKind::Default => Ok(Box::new(DefaultSimulator::new())),
        SimulatorKind::RecurringDemand => Ok(Box::new(RecurringDemandSimulator::new(
            config.demand_templates.clone(),
        )?)),
    }
}
