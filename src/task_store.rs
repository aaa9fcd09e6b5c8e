//! 任務紀錄存放

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sim_core::{Result, TaskRecord};

/// 任務紀錄存放
pub trait TaskStore {
    fn get(&self, id: u64) -> Result<Option<TaskRecord>>;

    /// 新增或覆寫（以ID為鍵）
    fn save(&mut self, task: &TaskRecord) -> Result<()>;

    /// 下一個可用的任務ID
    fn next_id(&self) -> Result<u64>;
}

/// JSON 檔案任務存放（檔案不存在時視為空）
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<TaskRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }
}

impl TaskStore for JsonTaskStore {
    fn get(&self, id: u64) -> Result<Option<TaskRecord>> {
        Ok(self.read_all()?.into_iter().find(|t| t.id == id))
    }

    fn save(&mut self, task: &TaskRecord) -> Result<()> {
        let mut tasks = self.read_all()?;
        match tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&tasks)?)?;
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.read_all()?.iter().map(|t| t.id).max().unwrap_or(0) + 1)
    }
}

/// 記憶體任務存放，保留每次寫入的歷程
#[derive(Debug, Clone, Default)]
pub struct MemoryTaskStore {
    tasks: BTreeMap<u64, TaskRecord>,
    history: Vec<TaskRecord>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：預先建立任務
    pub fn with_task(mut self, task: TaskRecord) -> Self {
        self.tasks.insert(task.id, task);
        self
    }

    /// 依寫入順序的任務快照
    pub fn history(&self) -> &[TaskRecord] {
        &self.history
    }
}

impl TaskStore for MemoryTaskStore {
    fn get(&self, id: u64) -> Result<Option<TaskRecord>> {
        Ok(self.tasks.get(&id).cloned())
    }

    fn save(&mut self, task: &TaskRecord) -> Result<()> {
        self.tasks.insert(task.id, task.clone());
        self.history.push(task.clone());
        Ok(())
    }

    fn next_id(&self) -> Result<u64> {
        Ok(self.tasks.keys().next_back().copied().unwrap_or(0) + 1)
    }
}
