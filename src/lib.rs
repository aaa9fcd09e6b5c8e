//! # plansim
//!
//! 供應鏈計劃執行模擬：驅動器、任務紀錄與日誌設定

pub mod driver;
pub mod logging;
pub mod task_store;

// Re-export 主要類型
pub use driver::{PauseHook, RunSummary, SimulationDriver};
pub use task_store::{JsonTaskStore, MemoryTaskStore, TaskStore};
