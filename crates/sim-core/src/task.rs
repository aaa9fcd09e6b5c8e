//! 模擬任務紀錄

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 任務名稱
pub const SIMULATION_TASK: &str = "simulation";

/// 可被模擬接手的任務名稱（含舊排程系統建立的名稱）
pub const SIMULATION_TASK_NAMES: [&str; 2] = [SIMULATION_TASK, "frepple_simulation"];

/// 任務狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "percent", rename_all = "snake_case")]
pub enum TaskStatus {
    /// 等待執行
    Waiting,
    /// 執行中（完成百分比）
    Running(u8),
    /// 成功結束
    Done,
    /// 失敗結束
    Failed,
}

impl TaskStatus {
    /// 是否為終止狀態
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// 由已完成/總桶數計算進度
    pub fn progress(completed: usize, total: usize) -> Self {
        if total == 0 {
            return TaskStatus::Running(100);
        }
        let percent = (completed.min(total) * 100 / total) as u8;
        TaskStatus::Running(percent)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Waiting => f.write_str("Waiting"),
            TaskStatus::Running(percent) => write!(f, "{}%", percent),
            TaskStatus::Done => f.write_str("Done"),
            TaskStatus::Failed => f.write_str("Failed"),
        }
    }
}

/// 任務紀錄（外部監控唯一的進度管道）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub name: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub arguments: String,
    pub submitted: NaiveDateTime,
    #[serde(default)]
    pub started: Option<NaiveDateTime>,
    #[serde(default)]
    pub finished: Option<NaiveDateTime>,
}

impl TaskRecord {
    /// 創建等待中的模擬任務
    pub fn new(id: u64, submitted: NaiveDateTime) -> Self {
        Self {
            id,
            name: SIMULATION_TASK.to_string(),
            status: TaskStatus::Waiting,
            message: String::new(),
            arguments: String::new(),
            submitted,
            started: None,
            finished: None,
        }
    }

    /// 是否可被模擬接手（等待中、未開始、未結束）
    pub fn is_claimable(&self) -> bool {
        self.status == TaskStatus::Waiting
            && self.started.is_none()
            && self.finished.is_none()
            && SIMULATION_TASK_NAMES.contains(&self.name.as_str())
    }

    /// 開始執行
    pub fn start(&mut self, now: NaiveDateTime) {
        self.status = TaskStatus::Running(0);
        self.started = Some(now);
    }

    /// 更新進度
    pub fn report_progress(&mut self, status: TaskStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    /// 成功結束
    pub fn finish(&mut self, message: impl Into<String>, now: NaiveDateTime) {
        self.status = TaskStatus::Done;
        self.message = message.into();
        self.finished = Some(now);
    }

    /// 失敗結束
    pub fn fail(&mut self, message: impl Into<String>, now: NaiveDateTime) {
        self.status = TaskStatus::Failed;
        self.message = message.into();
        self.finished = Some(now);
    }
}
