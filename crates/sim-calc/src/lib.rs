//! # Simulation Engine
//!
//! 逐時間桶執行計劃的模擬引擎：分桶、物料可行性、訂單生命週期、需求出貨與績效指標

pub mod bucketing;
pub mod feasibility;
pub mod lifecycle;
pub mod metrics;
pub mod shipment;
pub mod simulator;

// Re-export 主要類型
pub use bucketing::{Bucket, TimeBucketer};
pub use feasibility::{Feasibility, FeasibilityChecker};
pub use lifecycle::{OrderLifecycle, TransitionReport};
pub use metrics::{MetricsReport, SimulationMetrics};
pub use shipment::{DemandShipment, Shipment, ShipmentReport};
pub use simulator::{build_simulator, DefaultSimulator, RecurringDemandSimulator, Simulator};
