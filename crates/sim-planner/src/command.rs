//! 外部指令計劃引擎
//!
//! 模型寫入交換檔後執行指令；指令以 `PLANSIM_CURRENT_DATE` 與 `PLANSIM_MODEL`
//! 環境變數取得目前日期與交換檔路徑，並將新的建議訂單寫回交換檔。

use std::path::{Path, PathBuf};
use std::process::Command;

use sim_core::{Order, OrderStatus, Result, SimError, SimulationClock, SupplyChainModel};

use crate::{PlanOutcome, PlanningEngine};

/// 目前日期環境變數
pub const ENV_CURRENT_DATE: &str = "PLANSIM_CURRENT_DATE";

/// 交換檔路徑環境變數
pub const ENV_MODEL: &str = "PLANSIM_MODEL";

/// 外部指令計劃引擎
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    exchange_file: Option<PathBuf>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>, exchange_file: Option<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            exchange_file,
        }
    }

    /// 交換檔路徑（未設置時使用暫存目錄）
    fn exchange_path(&self) -> PathBuf {
        self.exchange_file.clone().unwrap_or_else(|| {
            std::env::temp_dir().join(format!("plansim-exchange-{}.json", std::process::id()))
        })
    }

    fn run(&self, exchange: &Path, clock: &SimulationClock) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .env(ENV_CURRENT_DATE, clock.current_date().to_string())
            .env(ENV_MODEL, exchange)
            .status()
            .map_err(|e| SimError::Planner(format!("無法啟動 {}: {}", self.program, e)))?;

        if !status.success() {
            return Err(SimError::Planner(format!("{} 執行失敗（{}）", self.program, status)));
        }
        Ok(())
    }

    /// 讀回交換檔中的建議訂單
    fn read_proposals(exchange: &Path) -> Result<Vec<Order>> {
        let planned = SupplyChainModel::load(exchange)
            .map_err(|e| SimError::Planner(format!("無法讀取計劃結果 {}: {}", exchange.display(), e)))?;
        Ok(planned
            .orders
            .into_iter()
            .filter(|o| o.status == OrderStatus::Proposed)
            .collect())
    }
}

impl PlanningEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn generate_plan(
        &mut self,
        model: &mut SupplyChainModel,
        clock: &SimulationClock,
    ) -> Result<PlanOutcome> {
        let exchange = self.exchange_path();
        model.current_date = Some(clock.current_date());
        model.save(&exchange)?;

        tracing::debug!("執行計劃引擎 {} {:?}（{}）", self.program, self.args, exchange.display());
        let result = self
            .run(&exchange, clock)
            .and_then(|_| Self::read_proposals(&exchange));

        if self.exchange_file.is_none() {
            let _ = std::fs::remove_file(&exchange);
        }

        let proposals = model.replace_proposed_orders(result?);
        tracing::info!("計劃引擎 {} 產生建議訂單 {} 筆", self.program, proposals);
        Ok(PlanOutcome::replaced(self.program.clone(), proposals))
    }
}
