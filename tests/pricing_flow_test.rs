// ==========================================
// 配送定价全流程集成测试
// ==========================================
// 测试目标: 新建定价 → 落库 → 编辑 → 删除 → 分桶对账 → 审计日志
// 存储: 临时 SQLite 文件
// ==========================================


use pharma_delivery::config::ConfigManager;
use pharma_delivery::domain::action_log::ActionType;
use pharma_delivery::domain::pricing::PricingWarning;
use pharma_delivery::domain::types::{CarrierName, PricingTier, RegionCode, TimeSlot};
use pharma_delivery::engine::PricingEngine;
use pharma_delivery::importer::RateTableImporter;
use pharma_delivery::logging;
use pharma_delivery::repository::{ActionLogRepository, DeliveryOrderRepository};
use std::sync::Arc;
use test_helpers::{order_from_pricing, pricing_input, test_date};

struct Fixture {
    _temp_file: tempfile::NamedTempFile,
    engine: PricingEngine,
    orders: Arc<DeliveryOrderRepository>,
    audit: Arc<ActionLogRepository>,
}

fn setup() -> Fixture {
    let (temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared_connection(&db_path).expect("Failed to open db");

    let config = ConfigManager::from_connection(conn.clone()).expect("Failed to create config");
    let tables = config.get_pricing_tables().expect("Failed to load tables");

    let orders = Arc::new(DeliveryOrderRepository::from_connection(conn.clone()));
    let audit = Arc::new(ActionLogRepository::new(conn));
    let engine = PricingEngine::new(tables, orders.clone())
        .expect("Failed to create engine")
        .with_event_publisher(audit.clone());

    Fixture {
        _temp_file: temp_file,
        engine,
        orders,
        audit,
    }
}

/// 定价并在锁内落库
fn create_order(fx: &Fixture, id: &str, neighborhood: &str, slot: TimeSlot) -> f64 {
    let input = pricing_input("Balneário Camboriú", neighborhood, slot);
    let (pricing, _) = fx
        .engine
        .resolve_pricing_and_commit(&input, |pricing, _| {
            fx.orders.insert(&order_from_pricing(id, &input, pricing))
        })
        .expect("Failed to commit order");
    pricing.fee
}

#[test]
fn test_create_delete_reconcile_flow() {
    logging::init_test();
    println!("\n=== 测试：新建 → 删除 → 对账 ===");

    let fx = setup();

    // 步骤 1: 当日首单（上午）为独单价
    let first = create_order(&fx, "m1", "Centro", TimeSlot::Morning);
    assert_eq!(first, 12.0, "当日首单应为独单价");
    println!("✓ 步骤 1: 首单运费 {:.2}", first);

    // 步骤 2: 第二张上午单 → normal
    let second = create_order(&fx, "m2", "Centro", TimeSlot::Morning);
    assert_eq!(second, 7.0, "同时段第二单应为普通价");

    // 步骤 3: 下午单（上午已 2 单）→ normal
    let third = create_order(&fx, "a1", "Nova Esperança", TimeSlot::Afternoon);
    assert_eq!(third, 9.0, "另一时段已超 1 单时应为普通价");
    println!("✓ 步骤 2-3: 后续订单均为普通价");

    // 步骤 4: m1 在首单后仍保持独单价（不降级）; 删除 m2
    let deleted = fx.orders.delete("m2").expect("Failed to delete");
    assert!(deleted.is_some(), "订单应存在");

    // 步骤 5: 删除后对账
    let result = fx
        .engine
        .reconcile_bucket_after_deletion(CarrierName::CarrierB, test_date());
    assert!(result.verified, "对账应完成");
    assert_eq!(result.promoted_order_ids, vec!["a1".to_string()]);
    println!("✓ 步骤 5: 提升订单 {:?}", result.promoted_order_ids);

    let a1 = fx.orders.find_by_id("a1").unwrap().unwrap();
    assert_eq!(a1.fee, 14.0, "下午单应提升为独单价");
    let m1 = fx.orders.find_by_id("m1").unwrap().unwrap();
    assert_eq!(m1.fee, 12.0, "上午首单保持独单价");

    // 步骤 6: 审计日志
    let logs = fx.audit.find_by_order_id("a1").expect("Failed to query logs");
    assert_eq!(logs.len(), 1, "应有一条提升日志");
    assert_eq!(logs[0].action_type, ActionType::FeePromoted.to_string());
    assert_eq!(logs[0].actor, "system");

    let reconciles = fx
        .audit
        .find_by_action_type(ActionType::BucketReconcile)
        .expect("Failed to query logs");
    assert_eq!(reconciles.len(), 1, "应有一条对账日志");
    println!("✓ 步骤 6: 审计日志已落库");

    // 步骤 7: 重跑对账不应产生新提升
    let rerun = fx.engine.reconcile_bucket(CarrierName::CarrierB, test_date());
    assert!(rerun.promoted_order_ids.is_empty(), "对账应幂等");
    println!("✓ 步骤 7: 对账幂等");
}

#[test]
fn test_manual_fee_survives_edit_and_reconcile() {
    logging::init_test();
    println!("\n=== 测试：人工改价保留 ===");

    let fx = setup();
    create_order(&fx, "m1", "Centro", TimeSlot::Morning);
    create_order(&fx, "m2", "Centro", TimeSlot::Morning);

    // 人工改价 m1 → 99.00
    let mut m1 = fx.orders.find_by_id("m1").unwrap().unwrap();
    m1.fee = 99.0;
    fx.orders.update(&m1).expect("Failed to update");

    // 编辑 m1 的街区: 运费保留
    let plan = fx
        .engine
        .plan_edit(&m1, &pricing_input("Balneário Camboriú", "Barra", TimeSlot::Morning));
    assert!(!plan.apply_fee, "人工改价不应被覆盖");
    assert!(plan.pricing.has_warning(PricingWarning::ManualFeePreserved));
    assert_eq!(plan.pricing.region, RegionCode::Barra);
    m1.region_code = Some(plan.pricing.region);
    m1.fee = plan.fee_to_store();
    fx.orders.update(&m1).expect("Failed to update");

    // 删除 m2 后对账: m1 被跳过
    fx.orders.delete("m2").expect("Failed to delete");
    let result = fx
        .engine
        .reconcile_bucket_after_deletion(CarrierName::CarrierB, test_date());
    assert!(result.promoted_order_ids.is_empty());
    assert_eq!(result.skipped_manual_order_ids, vec!["m1".to_string()]);
    assert_eq!(fx.orders.find_by_id("m1").unwrap().unwrap().fee, 99.0);
    println!("✓ 人工改价在编辑与对账后均保留");
}

#[test]
fn test_edit_recomputes_table_fee() {
    logging::init_test();

    let fx = setup();
    create_order(&fx, "m1", "Centro", TimeSlot::Morning);
    create_order(&fx, "a1", "Centro", TimeSlot::Afternoon);
    create_order(&fx, "a2", "Centro", TimeSlot::Afternoon);

    // m1 原为独单价 12.00; 改派到下午（下午已 2 单）→ 普通价
    let m1 = fx.orders.find_by_id("m1").unwrap().unwrap();
    assert_eq!(m1.fee, 12.0);
    let plan = fx
        .engine
        .plan_edit(&m1, &pricing_input("Balneário Camboriú", "Centro", TimeSlot::Afternoon));
    assert!(plan.apply_fee);
    assert_eq!(plan.pricing.tier, PricingTier::Normal);
    assert_eq!(plan.fee_to_store(), 7.0);
}

#[test]
fn test_unmapped_city_requires_manual_fee() {
    logging::init_test();

    let fx = setup();
    let input = pricing_input("Florianópolis", "Centro", TimeSlot::Morning);
    let result = fx.engine.resolve_pricing(&input);

    assert_eq!(result.region, RegionCode::Other);
    assert_eq!(result.carrier, None);
    assert_eq!(result.fee, 0.0);
    assert!(result.needs_manual_fee(), "未映射城市需人工录入运费");
}

#[tokio::test]
async fn test_engine_uses_imported_rates() {
    logging::init_test();
    println!("\n=== 测试：CSV 费率导入 → 配置 → 引擎 ===");

    let (_temp_file, db_path) = test_helpers::create_test_db().expect("Failed to create test db");
    let conn = test_helpers::open_shared_connection(&db_path).expect("Failed to open db");
    let config = ConfigManager::from_connection(conn.clone()).expect("Failed to create config");

    // 步骤 1: 导入新费率并保存
    let mut tables = config.get_pricing_tables().expect("Failed to load tables");
    let mut csv = String::from("carrier,region,normal_fee,unique_fee\n");
    for (carrier, region, entry) in tables.rates.entries() {
        let (normal, unique) = if carrier == CarrierName::CarrierB && region == RegionCode::Bc {
            (8.0, Some(13.5))
        } else {
            (entry.normal_fee, entry.unique_fee)
        };
        csv.push_str(&format!(
            "{},{},{},{}\n",
            carrier.to_db_str(),
            region.to_db_str(),
            normal,
            unique.map(|u| u.to_string()).unwrap_or_default()
        ));
    }
    tables.rates = RateTableImporter
        .import_from_reader(csv.as_bytes())
        .expect("Failed to import rates");
    config.save_pricing_tables(&tables).expect("Failed to save tables");
    println!("✓ 步骤 1: 费率已导入");

    // 步骤 2: 引擎从配置读取
    let orders = Arc::new(DeliveryOrderRepository::from_connection(conn));
    let engine = PricingEngine::from_config(&config, orders)
        .await
        .expect("Failed to create engine");

    let result = engine.resolve_pricing(&pricing_input(
        "Balneário Camboriú",
        "Centro",
        TimeSlot::Morning,
    ));
    assert_eq!(result.fee, 13.5, "应使用导入后的独单价");
    println!("✓ 步骤 2: 引擎使用新费率");
}
