//! 集成測試：以驅動器執行完整模擬

use std::cell::RefCell;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use plansim::{JsonTaskStore, MemoryTaskStore, SimulationDriver, TaskStore};
use rstest::rstest;
use rust_decimal::Decimal;
use sim_core::*;
use sim_planner::FnEngine;

fn d(n: i64) -> Decimal {
    Decimal::from(n)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
}

/// 起始日後第 n 天零時
fn at(n: i64) -> NaiveDateTime {
    (start() + Duration::days(n)).and_time(NaiveTime::MIN)
}

fn run_one_bucket(mut model: SupplyChainModel) -> SupplyChainModel {
    let config = SimulationConfig::new().with_horizon(1).with_step(1);
    SimulationDriver::new(config, MemoryTaskStore::new())
        .run(&mut model)
        .unwrap();
    model
}

#[test]
fn test_full_shipment_from_stock() {
    // 庫存 100，需求 60，無最小出貨量
    let model = run_one_bucket(
        SupplyChainModel::new()
            .with_current_date(start())
            .with_buffer(Buffer::new("BIKE", "DC", d(100)))
            .with_demand(Demand::new("SO-1", "BIKE", d(60), at(0)).with_location("DC")),
    );

    assert_eq!(model.buffers.on_hand("BIKE", "DC").unwrap(), d(40));
    let demand = model.demand("SO-1").unwrap();
    assert_eq!(demand.status, DemandStatus::Closed);
    assert_eq!(
        demand.outcome,
        Some(DemandOutcome::DeliveredOnTime { date: start() })
    );
}

#[test]
fn test_min_shipment_blocks_partial_delivery() {
    // 庫存 10，需求 60，最小出貨量 20
    let model = run_one_bucket(
        SupplyChainModel::new()
            .with_current_date(start())
            .with_buffer(Buffer::new("BIKE", "DC", d(10)))
            .with_demand(
                Demand::new("SO-1", "BIKE", d(60), at(0))
                    .with_location("DC")
                    .with_min_shipment(d(20)),
            ),
    );

    assert_eq!(model.buffers.on_hand("BIKE", "DC").unwrap(), d(10));
    let demand = model.demand("SO-1").unwrap();
    assert!(demand.is_open());
    assert_eq!(demand.quantity, d(60));
}

#[test]
fn test_demand_past_max_lateness_expires() {
    // 到期日在時間桶結束前 40 天，最大延遲 30 天
    let model = run_one_bucket(
        SupplyChainModel::new()
            .with_current_date(start())
            .with_buffer(Buffer::new("BIKE", "DC", d(0)))
            .with_demand(
                Demand::new("SO-1", "BIKE", d(60), at(1) - Duration::days(40))
                    .with_location("DC")
                    .with_max_lateness(Duration::days(30)),
            ),
    );

    let demand = model.demand("SO-1").unwrap();
    assert_eq!(demand.status, DemandStatus::Closed);
    assert_eq!(demand.outcome, Some(DemandOutcome::Expired));
}

#[test]
fn test_manufacturing_order_consumes_at_start() {
    // 製造訂單數量 5，開始時耗用 X 每單位 2
    let model = run_one_bucket(
        SupplyChainModel::new()
            .with_current_date(start())
            .with_buffer(Buffer::new("X", "F", d(100)))
            .with_buffer(Buffer::new("P", "F", d(0)))
            .with_operation(
                Operation::new("make-p", "F")
                    .with_material(OperationMaterial::new("X", d(-2), FlowType::Start))
                    .with_material(OperationMaterial::new("P", d(1), FlowType::End)),
            )
            .with_order(Order::manufacturing("make-p", d(5), at(0), at(10))),
    );

    assert_eq!(model.buffers.on_hand("X", "F").unwrap(), d(90));
    assert_eq!(model.buffers.on_hand("P", "F").unwrap(), d(0));
    assert_eq!(model.orders[0].status, OrderStatus::Confirmed);
}

/// 車輪採購後組裝成自行車，出貨給客戶
fn bike_factory() -> SupplyChainModel {
    SupplyChainModel::new()
        .with_current_date(start())
        .with_buffer(Buffer::new("WHEEL", "F", d(0)).with_unit_cost(d(5)))
        .with_buffer(Buffer::new("BIKE", "F", d(0)).with_unit_cost(d(100)))
        .with_operation(
            Operation::new("make-bike", "F")
                .with_material(OperationMaterial::new("WHEEL", d(-2), FlowType::Start))
                .with_material(OperationMaterial::new("BIKE", d(1), FlowType::End)),
        )
        .with_order(Order::purchase("WHEEL", "F", d(20), at(0), at(1)))
        .with_order(Order::manufacturing("make-bike", d(10), at(1), at(3)))
        .with_demand(Demand::new("SO-1", "BIKE", d(10), at(2)).with_location("F"))
}

#[test]
fn test_multi_bucket_plan_execution() {
    let config = SimulationConfig::new().with_horizon(5).with_step(1);
    let mut driver = SimulationDriver::new(config, MemoryTaskStore::new());
    let mut model = bike_factory();

    let summary = driver.run(&mut model).unwrap();

    assert_eq!(summary.buckets, 5);
    assert!(model.orders.iter().all(|o| o.status == OrderStatus::Closed));
    assert_eq!(model.buffers.on_hand("WHEEL", "F").unwrap(), d(0));
    assert_eq!(model.buffers.on_hand("BIKE", "F").unwrap(), d(0));
    assert_eq!(
        model.demand("SO-1").unwrap().outcome,
        Some(DemandOutcome::DeliveredOnTime { date: start() + Duration::days(2) })
    );
    assert_eq!(summary.metrics.demands_shipped, 1);
    assert_eq!(summary.metrics.demands_late, 0);
    // 製造訂單於前兩個時間桶在製
    assert_eq!(summary.metrics.average_wip_quantity, d(4));
}

#[test]
fn test_late_delivery_when_supply_arrives_after_due() {
    let mut model = bike_factory();
    model.demands[0].due = at(0);

    let config = SimulationConfig::new().with_horizon(5).with_step(1);
    let summary = SimulationDriver::new(config, MemoryTaskStore::new())
        .run(&mut model)
        .unwrap();

    assert_eq!(summary.metrics.demands_late, 1);
    assert_eq!(summary.metrics.average_lateness_days, d(2));
    assert_eq!(
        model.demand("SO-1").unwrap().outcome,
        Some(DemandOutcome::DeliveredLate { date: start() + Duration::days(2) })
    );
}

#[rstest]
#[case(7, 1, 7)]
#[case(28, 7, 4)]
#[case(10, 7, 2)]
#[case(3, 7, 1)]
fn test_bucket_count_and_final_progress(
    #[case] horizon: u32,
    #[case] step: u32,
    #[case] buckets: usize,
) {
    let config = SimulationConfig::new().with_horizon(horizon).with_step(step);
    let mut driver = SimulationDriver::new(config, MemoryTaskStore::new());

    let summary = driver.run(&mut bike_factory()).unwrap();

    assert_eq!(summary.buckets, buckets);
    assert_eq!(summary.last.end, start() + Duration::days(i64::from(horizon)));
    let last = driver.tasks().history().last().unwrap();
    assert_eq!(last.status, TaskStatus::Done);
    assert_eq!(last.message, summary.message());
}

#[test]
fn test_planner_runs_at_simulated_now() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let recorder = Rc::clone(&seen);
    let engine = FnEngine::new("recorder", move |model: &mut SupplyChainModel, clock: &SimulationClock| {
        assert_eq!(model.current_date, Some(clock.current_date()));
        recorder.borrow_mut().push(clock.current_date());
        // 每個時間桶補一筆隔日到貨的採購建議
        let now = clock.now();
        Ok(model.replace_proposed_orders(vec![Order::purchase(
            "BIKE",
            "DC",
            d(5),
            now,
            now + Duration::days(1),
        )]))
    });

    let config = SimulationConfig::new().with_horizon(3).with_step(1);
    let mut driver = SimulationDriver::new(config, MemoryTaskStore::new())
        .with_engine(Box::new(engine));
    let mut model = SupplyChainModel::new()
        .with_current_date(start())
        .with_buffer(Buffer::new("BIKE", "DC", d(0)));

    driver.run(&mut model).unwrap();

    assert_eq!(
        *seen.borrow(),
        vec![start(), start() + Duration::days(1), start() + Duration::days(2)]
    );
    // 每個建議當桶下達並於同桶收貨
    assert_eq!(model.buffers.on_hand("BIKE", "DC").unwrap(), d(15));
    assert_eq!(model.orders_with_status(OrderStatus::Closed).count(), 3);
}

#[test]
fn test_failure_keeps_committed_buckets() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let engine = FnEngine::new("flaky", move |_: &mut SupplyChainModel, _: &SimulationClock| {
        *counter.borrow_mut() += 1;
        if *counter.borrow() == 3 {
            return Err(SimError::Planner("solver crashed".to_string()));
        }
        Ok(0)
    });

    let config = SimulationConfig::new().with_horizon(5).with_step(1);
    let mut driver = SimulationDriver::new(config, MemoryTaskStore::new())
        .with_engine(Box::new(engine));
    let mut model = bike_factory();

    let err = driver.run(&mut model).unwrap_err();

    assert!(matches!(err, SimError::Planner(_)));
    assert_eq!(*calls.borrow(), 3);
    // 前兩個時間桶的結果保留：採購已收貨、製造訂單已下達
    assert_eq!(model.current_date, Some(start() + Duration::days(1)));
    assert_eq!(model.orders[0].status, OrderStatus::Closed);
    assert_eq!(model.orders[1].status, OrderStatus::Confirmed);
    assert_eq!(model.buffers.on_hand("WHEEL", "F").unwrap(), d(0));

    let last = driver.tasks().history().last().unwrap();
    assert_eq!(last.status, TaskStatus::Failed);
    assert!(last.message.contains("solver crashed"));
}

fn submitted() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, 31)
        .unwrap()
        .and_hms_opt(23, 0, 0)
        .unwrap()
}

#[rstest]
#[case::simulation("simulation")]
#[case::legacy_name("frepple_simulation")]
fn test_pre_created_task_is_claimed(#[case] name: &str) {
    let mut task = TaskRecord::new(5, submitted());
    task.name = name.to_string();
    let store = MemoryTaskStore::new().with_task(task);
    let config = SimulationConfig::new().with_horizon(2).with_task_id(5);
    let mut driver = SimulationDriver::new(config, store);

    driver.run(&mut bike_factory()).unwrap();

    let task = driver.tasks().get(5).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.arguments, "--horizon=2 --step=1");
    assert!(task.started.is_some());
    assert!(task.finished.is_some());
    assert_eq!(task.name, name);
}

#[test]
fn test_invalid_step_fails_pre_created_task() {
    let store = MemoryTaskStore::new().with_task(TaskRecord::new(7, submitted()));
    let config = SimulationConfig::new().with_step(0).with_task_id(7);
    let mut driver = SimulationDriver::new(config, store);

    let err = driver.run(&mut bike_factory()).unwrap_err();

    assert!(matches!(err, SimError::Config(_)));
    let task = driver.tasks().get(7).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.message, err.to_string());
    assert!(task.finished.is_some());
}

#[rstest]
#[case::missing(None)]
#[case::finished(Some(TaskStatus::Done))]
#[case::running(Some(TaskStatus::Running(40)))]
fn test_unclaimable_task_is_rejected(#[case] status: Option<TaskStatus>) {
    let mut store = MemoryTaskStore::new();
    if let Some(status) = status {
        let mut task = TaskRecord::new(5, submitted());
        task.status = status;
        store = store.with_task(task);
    }
    let config = SimulationConfig::new().with_task_id(5);
    let mut driver = SimulationDriver::new(config, store);
    let mut model = bike_factory();
    let before = model.clone();

    let err = driver.run(&mut model).unwrap_err();

    assert!(matches!(err, SimError::Config(_)));
    assert!(driver.tasks().history().is_empty());
    assert_eq!(model, before);
}

#[test]
fn test_json_store_and_initial_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("model.json");
    let fixture = dir.path().join("fixture.json");
    let task_file = dir.path().join("tasks.json");

    // 模型中有舊資料；初始資料會整批取代
    SupplyChainModel::new()
        .with_current_date(start())
        .with_buffer(Buffer::new("OLD", "DC", d(1)))
        .save(&database)
        .unwrap();
    bike_factory().save(&fixture).unwrap();

    let config = SimulationConfig::new().with_horizon(5).with_initial(&fixture);
    let mut model = SupplyChainModel::load(&database).unwrap();
    let mut driver = SimulationDriver::new(config, JsonTaskStore::new(&task_file));
    driver.run(&mut model).unwrap();
    model.save(&database).unwrap();

    let stored = SupplyChainModel::load(&database).unwrap();
    assert!(!stored.buffers.contains("OLD", "DC"));
    assert!(!stored.demand("SO-1").unwrap().is_open());

    let tasks = JsonTaskStore::new(&task_file);
    let task = tasks.get(1).unwrap().unwrap();
    assert_eq!(task.status, TaskStatus::Done);
    assert_eq!(task.message, "Simulated from 2025-11-01 till 2025-11-06");
}

#[test]
fn test_recurring_demand_strategy() {
    let config = SimulationConfig::new()
        .with_horizon(14)
        .with_step(7)
        .with_simulator(SimulatorKind::RecurringDemand)
        .with_demand_template(DemandTemplate::new("BIKE", "DC", d(10), 7).with_due_offset(3));
    let mut driver = SimulationDriver::new(config, MemoryTaskStore::new());
    let mut model = SupplyChainModel::new()
        .with_current_date(start())
        .with_buffer(Buffer::new("BIKE", "DC", d(15)));

    let summary = driver.run(&mut model).unwrap();

    assert_eq!(model.demands.len(), 2);
    assert_eq!(summary.metrics.demands_shipped, 1);
    // 第二筆只能部分出貨
    let second = model.demand("Demand #2").unwrap();
    assert!(second.is_open());
    assert_eq!(second.quantity, d(5));
}

#[test]
fn test_sample_fixture_runs() {
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/bike_factory.json");
    let mut model = SupplyChainModel::load(&fixture).unwrap();

    let config = SimulationConfig::new().with_horizon(7);
    let summary = SimulationDriver::new(config, MemoryTaskStore::new())
        .run(&mut model)
        .unwrap();

    assert_eq!(summary.metrics.demands_shipped, 1);
    assert_eq!(summary.metrics.demands_late, 0);
    assert_eq!(model.buffers.on_hand("BIKE", "factory").unwrap(), d(2));
    assert_eq!(model.buffers.on_hand("WHEEL", "factory").unwrap(), d(0));
}
