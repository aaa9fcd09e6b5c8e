use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use plansim::{logging, JsonTaskStore, SimulationDriver};
use sim_core::{PlannerConfig, SimulationConfig, SimulatorKind, SupplyChainModel};

#[derive(Debug, Parser)]
#[command(
    name = "plansim",
    version,
    about = "Simulate the execution of a supply-chain plan bucket by bucket"
)]
struct Cli {
    /// Model store (JSON)
    #[arg(long)]
    database: PathBuf,

    /// Configuration file (TOML); command-line options override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of days into the future to simulate
    #[arg(long)]
    horizon: Option<u32>,

    /// Bucket size in days
    #[arg(long)]
    step: Option<u32>,

    /// Fixture that replaces the model store before the run
    #[arg(long)]
    initial: Option<PathBuf>,

    /// Simulation strategy: default or recurring_demand
    #[arg(long)]
    simulator: Option<SimulatorKind>,

    /// Wait for the operator after the plan of each bucket is generated
    #[arg(long)]
    pause: bool,

    /// Pre-created task to report progress on
    #[arg(long)]
    task: Option<u64>,

    /// Task record file
    #[arg(long, default_value = "tasks.json")]
    task_file: PathBuf,

    /// External planning command, run once per bucket
    #[arg(long)]
    planner: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// 配置檔與命令列選項合併
    fn simulation_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => SimulationConfig::new(),
        };

        if let Some(horizon) = self.horizon {
            config = config.with_horizon(horizon);
        }
        if let Some(step) = self.step {
            config = config.with_step(step);
        }
        if let Some(initial) = &self.initial {
            config = config.with_initial(initial.clone());
        }
        if let Some(simulator) = self.simulator {
            config = config.with_simulator(simulator);
        }
        if self.pause {
            config = config.with_pause(true);
        }
        if let Some(task) = self.task {
            config = config.with_task_id(task);
        }
        if let Some(command) = &self.planner {
            let planner = PlannerConfig {
                command: Some(command.clone()),
                ..config.planner.clone()
            };
            config = config.with_planner(planner);
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.simulation_config()?;
    let mut driver = SimulationDriver::new(config, JsonTaskStore::new(cli.task_file.clone()));

    let mut model = match SupplyChainModel::load(&cli.database)
        .with_context(|| format!("failed to open model store {}", cli.database.display()))
    {
        Ok(model) => model,
        Err(e) => {
            // 模型無法載入也要反映在任務紀錄上
            if let Err(task_err) = driver.abort(&format!("{:#}", e)) {
                tracing::error!("無法記錄任務失敗：{}", task_err);
            }
            return Err(e);
        }
    };

    let result = driver.run(&mut model);

    // 已提交的時間桶不回滾：成功或失敗都寫回模型
    model
        .save(&cli.database)
        .with_context(|| format!("failed to write model store {}", cli.database.display()))?;

    let summary = result?;
    println!("{}", summary.message());
    println!("{}", summary.metrics);
    Ok(())
}
