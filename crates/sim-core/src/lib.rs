//! # Simulation Core
//!
//! 模擬核心資料模型與類型定義

pub mod buffer;
pub mod clock;
pub mod config;
pub mod demand;
pub mod model;
pub mod operation;
pub mod order;
pub mod task;

// Re-export 主要類型
pub use buffer::{Buffer, BufferTable};
pub use clock::SimulationClock;
pub use config::{DemandTemplate, PlannerConfig, SimulationConfig, SimulatorKind};
pub use demand::{Demand, DemandOutcome, DemandStatus};
pub use model::SupplyChainModel;
pub use operation::{FlowType, Operation, OperationKind, OperationMaterial, OperationTable, SubOperation};
pub use order::{Order, OrderKind, OrderStatus};
pub use task::{TaskRecord, TaskStatus};

/// 模擬錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("配置錯誤: {0}")]
    Config(String),

    #[error("找不到庫存點: {item} @ {location}")]
    BufferNotFound { item: String, location: String },

    #[error("找不到作業: {0}")]
    OperationNotFound(String),

    #[error("找不到需求: {0}")]
    DemandNotFound(String),

    #[error("作業結構存在循環: {0}")]
    OperationCycle(String),

    #[error("作業 {operation} 無法執行數量 {quantity}")]
    Infeasible {
        operation: String,
        quantity: rust_decimal::Decimal,
    },

    #[error("無效的狀態轉換: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("任務錯誤: {0}")]
    Task(String),

    #[error("計劃引擎執行失敗: {0}")]
    Planner(String),

    #[error("初始資料載入失敗: {0}")]
    Fixture(String),

    #[error("檔案讀寫錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON 解析錯誤: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML 解析錯誤: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("其他錯誤: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SimError>;
