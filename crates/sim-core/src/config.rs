//! 模擬配置

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Result, SimError};

/// 預設模擬時界（天）
pub const DEFAULT_HORIZON_DAYS: u32 = 60;

/// 預設時間步長（天）
pub const DEFAULT_STEP_DAYS: u32 = 1;

/// 模擬配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 模擬時界（天）
    pub horizon_days: u32,

    /// 每個時間桶的天數（1 為日計劃，7 為週計劃）
    pub step_days: u32,

    /// 模擬策略
    pub simulator: SimulatorKind,

    /// 每個時間桶產生計劃後暫停，等待操作員繼續
    pub pause: bool,

    /// 初始狀態資料（指定時先清空再載入）
    pub initial: Option<PathBuf>,

    /// 預先建立的任務ID
    pub task_id: Option<u64>,

    /// 外部計劃引擎
    pub planner: PlannerConfig,

    /// 週期性需求樣板（`SimulatorKind::RecurringDemand` 使用）
    pub demand_templates: Vec<DemandTemplate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            step_days: DEFAULT_STEP_DAYS,
            simulator: SimulatorKind::Default,
            pause: false,
            initial: None,
            task_id: None,
            planner: PlannerConfig::default(),
            demand_templates: Vec::new(),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 TOML 字串載入
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 從 TOML 檔案載入
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("無法讀取配置檔 {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// 建構器模式：設置模擬時界
    pub fn with_horizon(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    /// 建構器模式：設置時間步長
    pub fn with_step(mut self, days: u32) -> Self {
        self.step_days = days;
        self
    }

    /// 建構器模式：設置模擬策略
    pub fn with_simulator(mut self, simulator: SimulatorKind) -> Self {
        self.simulator = simulator;
        self
    }

    /// 建構器模式：設置暫停
    pub fn with_pause(mut self, pause: bool) -> Self {
        self.pause = pause;
        self
    }

    /// 建構器模式：設置初始狀態資料
    pub fn with_initial(mut self, fixture: impl Into<PathBuf>) -> Self {
        self.initial = Some(fixture.into());
        self
    }

    /// 建構器模式：設置任務ID
    pub fn with_task_id(mut self, task_id: u64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// 建構器模式：設置計劃引擎
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// 建構器模式：添加需求樣板
    pub fn with_demand_template(mut self, template: DemandTemplate) -> Self {
        self.demand_templates.push(template);
        self
    }

    /// 任務紀錄中的參數字串
    pub fn arguments(&self) -> String {
        format!("--horizon={} --step={}", self.horizon_days, self.step_days)
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(SimError::Config(format!(
                "無效的模擬時界: {}",
                self.horizon_days
            )));
        }
        if self.step_days == 0 {
            return Err(SimError::Config(format!("無效的時間步長: {}", self.step_days)));
        }
        if self.simulator == SimulatorKind::RecurringDemand {
            if self.demand_templates.is_empty() {
                return Err(SimError::Config(
                    "週期性需求模擬缺少需求樣板".to_string(),
                ));
            }
            for template in &self.demand_templates {
                template.validate()?;
            }
        }
        Ok(())
    }
}

/// 模擬策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulatorKind {
    /// 只執行既有的開放需求
    #[default]
    Default,
    /// 依樣板週期性產生客戶需求
    RecurringDemand,
}

impl std::str::FromStr for SimulatorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(SimulatorKind::Default),
            "recurring_demand" | "recurring-demand" => Ok(SimulatorKind::RecurringDemand),
            other => Err(SimError::Config(format!("未知的模擬策略: {}", other))),
        }
    }
}

/// 外部計劃引擎配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// 計劃引擎指令（未設置時不產生新計劃）
    pub command: Option<String>,

    /// 指令參數
    pub args: Vec<String>,

    /// 與計劃引擎交換模型的檔案
    pub exchange_file: Option<PathBuf>,
}

impl PlannerConfig {
    pub fn command(program: impl Into<String>) -> Self {
        Self {
            command: Some(program.into()),
            ..Self::default()
        }
    }

    /// 建構器模式：添加參數
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// 建構器模式：設置交換檔
    pub fn with_exchange_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.exchange_file = Some(path.into());
        self
    }
}

/// 週期性需求樣板
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandTemplate {
    /// 物料ID
    pub item: String,

    /// 出貨地點
    pub location: String,

    /// 每筆需求數量
    pub quantity: Decimal,

    /// 產生間隔（天）
    pub interval_days: u32,

    /// 到期日相對於建立日的天數
    #[serde(default)]
    pub due_offset_days: u32,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub min_shipment: Option<Decimal>,

    /// 最大允許延遲（天）
    #[serde(default)]
    pub max_lateness_days: Option<u32>,
}

impl DemandTemplate {
    pub fn new(
        item: impl Into<String>,
        location: impl Into<String>,
        quantity: Decimal,
        interval_days: u32,
    ) -> Self {
        Self {
            item: item.into(),
            location: location.into(),
            quantity,
            interval_days,
            due_offset_days: 0,
            priority: 0,
            min_shipment: None,
            max_lateness_days: None,
        }
    }

    /// 建構器模式：設置到期日偏移
    pub fn with_due_offset(mut self, days: u32) -> Self {
        self.due_offset_days = days;
        self
    }

    /// 建構器模式：設置最大允許延遲
    pub fn with_max_lateness_days(mut self, days: u32) -> Self {
        self.max_lateness_days = Some(days);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantity <= Decimal::ZERO {
            return Err(SimError::Config(format!(
                "需求樣板 {}@{} 數量必須為正",
                self.item, self.location
            )));
        }
        if self.interval_days == 0 {
            return Err(SimError::Config(format!(
                "需求樣板 {}@{} 間隔必須為正",
                self.item, self.location
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_config() {
        let config = SimulationConfig::new();

        assert_eq!(config.horizon_days, 60);
        assert_eq!(config.step_days, 1);
        assert_eq!(config.simulator, SimulatorKind::Default);
        assert!(!config.pause);
        assert!(config.validate().is_ok());
        assert_eq!(config.arguments(), "--horizon=60 --step=1");
    }

    #[rstest]
    #[case(0, 1)]
    #[case(30, 0)]
    fn test_invalid_horizon_or_step(#[case] horizon: u32, #[case] step: u32) {
        let config = SimulationConfig::new().with_horizon(horizon).with_step(step);
        assert!(matches!(config.validate(), Err(SimError::Config(_))));
    }

    #[test]
    fn test_recurring_demand_requires_templates() {
        let config = SimulationConfig::new().with_simulator(SimulatorKind::RecurringDemand);
        assert!(config.validate().is_err());

        let config = config.with_demand_template(DemandTemplate::new(
            "BIKE",
            "DC",
            Decimal::from(10),
            7,
        ));
        assert!(config.validate().is_ok());

        let bad = SimulationConfig::new()
            .with_simulator(SimulatorKind::RecurringDemand)
            .with_demand_template(DemandTemplate::new("BIKE", "DC", Decimal::ZERO, 7));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_from_toml() {
        let config = SimulationConfig::from_toml_str(
            r#"
            horizon_days = 28
            step_days = 7
            simulator = "recurring_demand"

            [planner]
            command = "frepple-plan"
            args = ["--constrained"]

            [[demand_templates]]
            item = "BIKE"
            location = "DC"
            quantity = 10
            interval_days = 7
            due_offset_days = 14
            "#,
        )
        .unwrap();

        assert_eq!(config.horizon_days, 28);
        assert_eq!(config.step_days, 7);
        assert_eq!(config.simulator, SimulatorKind::RecurringDemand);
        assert_eq!(config.planner.command.as_deref(), Some("frepple-plan"));
        assert_eq!(config.demand_templates[0].due_offset_days, 14);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_simulator_kind() {
        assert_eq!("default".parse::<SimulatorKind>().unwrap(), SimulatorKind::Default);
        assert_eq!(
            "recurring-demand".parse::<SimulatorKind>().unwrap(),
            SimulatorKind::RecurringDemand
        );
        assert!("my.module.Simulator".parse::<SimulatorKind>().is_err());
    }
}
