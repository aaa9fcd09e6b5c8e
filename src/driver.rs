//! 模擬驅動器
//!
//! 逐時間桶推進模擬時鐘、呼叫計劃引擎與模擬步驟，並將進度寫入任務紀錄。
//! 每個步驟各自為一個交易單位；失敗時該步驟還原，之前已提交的時間桶保持不變。

use std::io::{BufRead, Write};

use chrono::{Local, NaiveDateTime};
use sim_calc::{build_simulator, Bucket, MetricsReport, Simulator, TimeBucketer};
use sim_core::{
    Result, SimError, SimulationClock, SimulationConfig, SupplyChainModel, TaskRecord, TaskStatus,
};
use sim_planner::{build_engine, PlanningEngine};

use crate::task_store::TaskStore;

/// 時間桶之間的暫停
pub type PauseHook = Box<dyn FnMut(&Bucket) -> Result<()>>;

/// 模擬執行摘要
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub buckets: usize,
    pub first: Bucket,
    pub last: Bucket,
    pub metrics: MetricsReport,
}

impl RunSummary {
    /// 任務結束訊息
    pub fn message(&self) -> String {
        format!("Simulated from {} till {}", self.first.start, self.last.end)
    }
}

/// 模擬驅動器
///
/// 模擬策略與計劃引擎未以建構器替換時，於接手任務後依配置建立。
pub struct SimulationDriver<S: TaskStore> {
    config: SimulationConfig,
    simulator: Option<Box<dyn Simulator>>,
    engine: Option<Box<dyn PlanningEngine>>,
    tasks: S,
    pause: PauseHook,
    wall_clock: fn() -> NaiveDateTime,
}

impl<S: TaskStore> SimulationDriver<S> {
    pub fn new(config: SimulationConfig, tasks: S) -> Self {
        Self {
            config,
            simulator: None,
            engine: None,
            tasks,
            pause: Box::new(wait_for_operator),
            wall_clock: local_now,
        }
    }

    /// 建構器模式：替換模擬策略
    pub fn with_simulator(mut self, simulator: Box<dyn Simulator>) -> Self {
        self.simulator = Some(simulator);
        self
    }

    /// 建構器模式：替換計劃引擎
    pub fn with_engine(mut self, engine: Box<dyn PlanningEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// 建構器模式：替換暫停處理
    pub fn with_pause_hook(mut self, pause: PauseHook) -> Self {
        self.pause = pause;
        self
    }

    pub fn tasks(&self) -> &S {
        &self.tasks
    }

    pub fn into_tasks(self) -> S {
        self.tasks
    }

    /// 執行模擬
    ///
    /// 任務紀錄無法接手時直接回傳錯誤；之後的任何錯誤（包括配置錯誤）
    /// 都會把任務標記為失敗後再回傳。
    pub fn run(&mut self, model: &mut SupplyChainModel) -> Result<RunSummary> {
        let mut task = self.claim_task()?;

        let result = self.prepare().and_then(|(mut simulator, mut engine)| {
            let result = self.execute(model, &mut task, simulator.as_mut(), engine.as_mut());
            self.simulator = Some(simulator);
            self.engine = Some(engine);
            result
        });

        match result {
            Ok(summary) => {
                task.finish(summary.message(), (self.wall_clock)());
                self.tasks.save(&task)?;
                tracing::info!("{}", summary.message());
                for line in summary.metrics.to_string().lines() {
                    tracing::info!("{}", line);
                }
                Ok(summary)
            }
            Err(e) => {
                self.fail_task(&mut task, &e.to_string());
                tracing::error!("模擬失敗：{}", e);
                Err(e)
            }
        }
    }

    /// 模擬開始前就失敗（例如模型無法載入）時，同樣接手任務並標記為失敗
    pub fn abort(&mut self, reason: &str) -> Result<()> {
        let mut task = self.claim_task()?;
        self.fail_task(&mut task, reason);
        Ok(())
    }

    fn fail_task(&mut self, task: &mut TaskRecord, reason: &str) {
        task.fail(reason, (self.wall_clock)());
        if let Err(save_err) = self.tasks.save(task) {
            tracing::error!("無法更新任務 {}：{}", task.id, save_err);
        }
    }

    /// 驗證配置並取得模擬策略與計劃引擎
    fn prepare(&mut self) -> Result<(Box<dyn Simulator>, Box<dyn PlanningEngine>)> {
        self.config.validate()?;
        let simulator = match self.simulator.take() {
            Some(simulator) => simulator,
            None => build_simulator(&self.config)?,
        };
        let engine = self
            .engine
            .take()
            .unwrap_or_else(|| build_engine(&self.config.planner));
        Ok((simulator, engine))
    }

    /// 取得任務紀錄：指定ID時必須是等待中的模擬任務，否則建立新任務
    fn claim_task(&mut self) -> Result<TaskRecord> {
        let now = (self.wall_clock)();
        let mut task = match self.config.task_id {
            Some(id) => {
                let task = self
                    .tasks
                    .get(id)?
                    .ok_or_else(|| SimError::Config(format!("找不到任務 {}", id)))?;
                if !task.is_claimable() {
                    return Err(SimError::Config(format!(
                        "任務 {} 無法執行（{}，{}）",
                        id, task.name, task.status
                    )));
                }
                task
            }
            None => TaskRecord::new(self.tasks.next_id()?, now),
        };

        task.arguments = self.config.arguments();
        task.start(now);
        self.tasks.save(&task)?;
        Ok(task)
    }

    fn execute(
        &mut self,
        model: &mut SupplyChainModel,
        task: &mut TaskRecord,
        simulator: &mut dyn Simulator,
        engine: &mut dyn PlanningEngine,
    ) -> Result<RunSummary> {
        if let Some(fixture) = &self.config.initial {
            tracing::info!("清空模型並載入初始資料 {}", fixture.display());
            model.reload_from_fixture(fixture)?;
        }

        let start = model
            .current_date
            .ok_or_else(|| SimError::Config("模型未設置目前日期".to_string()))?;
        let buckets = TimeBucketer::new(self.config.horizon_days, self.config.step_days)?
            .buckets(start)?;
        let (first, last) = match (buckets.first(), buckets.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(SimError::Config(format!("從 {} 起沒有可模擬的時間桶", start))),
        };

        tracing::info!(
            "模擬策略 {}，計劃引擎 {}，共 {} 個時間桶",
            simulator.name(),
            engine.name(),
            buckets.len()
        );

        let mut clock = SimulationClock::new(start);
        let total = buckets.len();
        for (idx, bucket) in buckets.iter().enumerate() {
            task.report_progress(
                TaskStatus::progress(idx, total),
                format!("Simulating bucket from {} to {}", bucket.start, bucket.end),
            );
            self.tasks.save(task)?;

            tracing::info!(
                "模擬時間桶 {}（{} 天，{}/{}）",
                bucket,
                bucket.len_days(),
                idx + 1,
                total
            );
            self.run_bucket(model, &mut clock, bucket, simulator, engine)?;
        }

        Ok(RunSummary {
            buckets: total,
            first,
            last,
            metrics: simulator.metrics().report(),
        })
    }

    /// 依固定順序執行單一時間桶的步驟
    fn run_bucket(
        &mut self,
        model: &mut SupplyChainModel,
        clock: &mut SimulationClock,
        bucket: &Bucket,
        simulator: &mut dyn Simulator,
        engine: &mut dyn PlanningEngine,
    ) -> Result<()> {
        model.atomic(|m| simulator.start_bucket(m, bucket))?;

        let created = model.atomic(|m| simulator.generate_customer_demand(m, bucket))?;
        tracing::debug!("新增客戶需求 {} 筆", created);

        clock.advance_to(bucket.start)?;
        let plan = model.atomic(|m| {
            m.current_date = Some(clock.current_date());
            engine.generate_plan(m, clock)
        })?;
        tracing::debug!("計劃引擎 {}：建議訂單 {} 筆", plan.engine, plan.proposals);

        if self.config.pause {
            (self.pause)(bucket)?;
        }

        let report = model.atomic(|m| simulator.create_purchase_orders(m, bucket))?;
        tracing::debug!("下達採購訂單 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);
        let report = model.atomic(|m| simulator.create_manufacturing_orders(m, bucket))?;
        tracing::debug!("下達製造訂單 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);
        let report = model.atomic(|m| simulator.create_distribution_orders(m, bucket))?;
        tracing::debug!("下達調撥訂單 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);
        let report = model.atomic(|m| simulator.receive_purchase_orders(m, bucket))?;
        tracing::debug!("採購收貨 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);
        let report = model.atomic(|m| simulator.receive_distribution_orders(m, bucket))?;
        tracing::debug!("調撥收貨 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);
        let report = model.atomic(|m| simulator.finish_manufacturing_orders(m, bucket))?;
        tracing::debug!("製造完工 {} 筆，跳過 {} 筆", report.transitioned, report.skipped);

        let shipped = model.atomic(|m| simulator.ship_customer_demand(m, bucket))?;
        tracing::debug!(
            "出貨 {} 筆（結案 {} 筆），逾期 {} 筆，無法出貨 {} 筆",
            shipped.shipments.len(),
            shipped.completed().count(),
            shipped.expired.len(),
            shipped.unshippable
        );

        model.atomic(|m| simulator.end_bucket(m, bucket))?;
        Ok(())
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// 等待操作員按 Enter 繼續
fn wait_for_operator(bucket: &Bucket) -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(
        stdout,
        "時間桶 {} 的計劃已產生，可於此時檢視。按 Enter 繼續...",
        bucket
    )?;
    stdout.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(())
}
