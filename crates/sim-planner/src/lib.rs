//! # Planning Engine
//!
//! 每個時間桶呼叫一次的計劃引擎介面（外部指令、無操作、閉包）

pub mod command;

// Re-export 主要類型
pub use command::CommandEngine;

use sim_core::{PlannerConfig, Result, SimulationClock, SupplyChainModel};

/// 計劃結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    /// 引擎名稱
    pub engine: String,

    /// 是否更新了建議訂單
    pub replaced: bool,

    /// 新的建議訂單數
    pub proposals: usize,
}

impl PlanOutcome {
    /// 創建未變更模型的結果
    pub fn unchanged(engine: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            replaced: false,
            proposals: 0,
        }
    }

    /// 創建已取代建議訂單的結果
    pub fn replaced(engine: impl Into<String>, proposals: usize) -> Self {
        Self {
            engine: engine.into(),
            replaced: true,
            proposals,
        }
    }
}

/// 計劃引擎
///
/// 讀取模型與模擬時鐘，寫回新的建議訂單；除成功/失敗外不檢查其他回傳內容。
pub trait PlanningEngine {
    fn name(&self) -> &str;

    fn generate_plan(
        &mut self,
        model: &mut SupplyChainModel,
        clock: &SimulationClock,
    ) -> Result<PlanOutcome>;
}

/// 不產生計劃（沿用模型中既有的建議訂單）
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEngine;

impl PlanningEngine for NullEngine {
    fn name(&self) -> &str {
        "none"
    }

    fn generate_plan(
        &mut self,
        _model: &mut SupplyChainModel,
        _clock: &SimulationClock,
    ) -> Result<PlanOutcome> {
        Ok(PlanOutcome::unchanged(self.name()))
    }
}

/// 以閉包實作的計劃引擎，閉包回傳新的建議訂單數
pub struct FnEngine<F> {
    name: String,
    plan: F,
}

impl<F> FnEngine<F>
where
    F: FnMut(&mut SupplyChainModel, &SimulationClock) -> Result<usize>,
{
    pub fn new(name: impl Into<String>, plan: F) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

impl<F> PlanningEngine for FnEngine<F>
where
    F: FnMut(&mut SupplyChainModel, &SimulationClock) -> Result<usize>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn generate_plan(
        &mut self,
        model: &mut SupplyChainModel,
        clock: &SimulationClock,
    ) -> Result<PlanOutcome> {
        let proposals = (self.plan)(model, clock)?;
        Ok(PlanOutcome::replaced(self.name.clone(), proposals))
    }
}

/// 依配置建立計劃引擎：未設置指令時不產生計劃
pub fn build_engine(config: &PlannerConfig) -> Box<dyn PlanningEngine> {
    match config.command.as_deref() {
        Some(program) => Box::new(CommandEngine::new(
            program,
            config.args.clone(),
            config.exchange_file.clone(),
        )),
        None => Box::new(NullEngine),
    }
}
