// ==========================================
// 药房配送协同系统 - 配送定价引擎（编排层）
// ==========================================
// 职责: 串联 区域解析 → 承运商分配 → 独单档判定 → 运费计算
// 输入: 地址原文 + (日期, 时段, 编辑中订单ID)
// 输出: PricingResult (区域/承运商/价格档/运费/降级告警)
// 红线: 引擎不负责订单持久化; 业务降级不抛错
// ==========================================
// 触发时机:
// - 新建: resolve_pricing (exclude=None)
// - 编辑: plan_edit (exclude=自身)
// - 删除: reconcile_bucket_after_deletion (只升不降)
// ==========================================

use crate::config::pricing_config_trait::PricingConfigReader;
use crate::config::pricing_tables::{ConfigResult, PricingTables};
use crate::domain::order::DeliveryOrder;
use crate::domain::pricing::{
    same_fee, EditPricingPlan, FeeQuote, PricingInput, PricingResult, PricingWarning,
    ReconcileResult, TierDecision,
};
use crate::domain::types::{CarrierName, PricingTier, RegionCode, TimeSlot};
use crate::engine::bucket::OrderStore;
use crate::engine::bucket_lock::BucketLocks;
use crate::engine::carrier_assignor::CarrierAssignor;
use crate::engine::events::{OptionalEventPublisher, PricingEvent, PricingEventPublisher};
use crate::engine::fee_calculator::FeeCalculator;
use crate::engine::region_resolver::{RegionResolution, RegionResolver};
use crate::engine::unique_tier::{bucket_pair_is_unique, UniqueTierResolver};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// PricingEngine - 配送定价引擎
// ==========================================
pub struct PricingEngine {
    tables: Arc<PricingTables>,
    region_resolver: RegionResolver,
    carrier_assignor: CarrierAssignor,
    fee_calculator: FeeCalculator,
    tier_resolver: UniqueTierResolver,
    store: Arc<dyn OrderStore>,
    bucket_locks: BucketLocks,
    event_publisher: OptionalEventPublisher,
}

impl PricingEngine {
    /// 创建定价引擎（构造时校验定价表）
    pub fn new(tables: PricingTables, store: Arc<dyn OrderStore>) -> ConfigResult<Self> {
        tables.validate()?;

        Ok(Self {
            region_resolver: RegionResolver::new(&tables.city_regions),
            carrier_assignor: CarrierAssignor::new(tables.region_carriers.clone()),
            fee_calculator: FeeCalculator::new(tables.rates.clone()),
            tier_resolver: UniqueTierResolver::new(),
            tables: Arc::new(tables),
            store,
            bucket_locks: BucketLocks::new(),
            event_publisher: OptionalEventPublisher::none(),
        })
    }

    /// 从配置读取器创建定价引擎
    pub async fn from_config(
        reader: &dyn PricingConfigReader,
        store: Arc<dyn OrderStore>,
    ) -> ConfigResult<Self> {
        let tables = reader.load_pricing_tables().await?;
        Self::new(tables, store)
    }

    /// 挂接审计事件发布者
    pub fn with_event_publisher(mut self, publisher: Arc<dyn PricingEventPublisher>) -> Self {
        self.event_publisher = OptionalEventPublisher::with_publisher(publisher);
        self
    }

    /// 当前生效的定价表
    pub fn tables(&self) -> &PricingTables {
        &self.tables
    }

    // ==========================================
    // 纯函数入口
    // ==========================================

    pub fn resolve_region(&self, city: &str, neighborhood: &str) -> RegionCode {
        self.region_resolver.resolve_region(city, neighborhood)
    }

    pub fn assign_carrier(
        &self,
        region: RegionCode,
        manual_override: Option<CarrierName>,
    ) -> Option<CarrierName> {
        self.carrier_assignor.assign_carrier(region, manual_override)
    }

    pub fn compute_fee(
        &self,
        region: RegionCode,
        carrier: CarrierName,
        tier: PricingTier,
    ) -> FeeQuote {
        self.fee_calculator.compute_fee(region, carrier, tier)
    }

    /// 独单档判定（读取分桶计数）
    pub fn decide_tier(
        &self,
        carrier: Option<CarrierName>,
        date: NaiveDate,
        slot: TimeSlot,
        exclude_order_id: Option<&str>,
    ) -> TierDecision {
        self.tier_resolver
            .decide_tier(self.store.as_ref(), carrier, date, slot, exclude_order_id)
    }

    // ==========================================
    // 定价编排
    // ==========================================

    /// 计算订单的区域、承运商、价格档与运费
    ///
    /// 判定期间持有 (承运商, 日期) 锁
    #[instrument(skip(self), fields(date = %input.date, slot = %input.slot))]
    pub fn resolve_pricing(&self, input: &PricingInput) -> PricingResult {
        let located = self.locate(input);
        match located.carrier {
            Some(c) => self
                .bucket_locks
                .with_lock(c, input.date, || self.price_located(input, located)),
            None => self.price_located(input, located),
        }
    }

    /// 定价并在同一把 (承运商, 日期) 锁内执行调用方写入
    ///
    /// 进程内串行化 “计数 → 判定 → 写回”,避免两张并发新单同时拿到独单价。
    ///
    /// 锁不可重入: `commit` 内不得对同一 (承运商, 日期) 调用
    /// `resolve_pricing` / `plan_edit` / `reconcile_bucket`,
    /// 写入后的重算请使用传入的 [`BucketSession`]。
    pub fn resolve_pricing_and_commit<T, F>(
        &self,
        input: &PricingInput,
        commit: F,
    ) -> RepositoryResult<(PricingResult, T)>
    where
        F: FnOnce(&PricingResult, &BucketSession<'_>) -> RepositoryResult<T>,
    {
        let located = self.locate(input);
        let run = || -> RepositoryResult<(PricingResult, T)> {
            let pricing = self.price_located(input, located);
            let session = BucketSession {
                engine: self,
                carrier: located.carrier,
                date: input.date,
            };
            let committed = commit(&pricing, &session)?;
            Ok((pricing, committed))
        };

        match located.carrier {
            Some(c) => self.bucket_locks.with_lock(c, input.date, run),
            None => run(),
        }
    }

    /// 编辑订单时的重算方案
    ///
    /// - 新定价排除订单自身计数
    /// - 原运费等于费率表值（未人工改价）→ 采用新运费
    /// - 原运费为人工改价 → 保留,告警 ManualFeePreserved
    /// - 原区域无法查表（人工录入为必填）→ 新运费可查表时采用
    #[instrument(skip(self, order, input), fields(order_id = %order.id))]
    pub fn plan_edit(&self, order: &DeliveryOrder, input: &PricingInput) -> EditPricingPlan {
        let mut edit_input = input.clone();
        edit_input.exclude_order_id = Some(order.id.clone());

        let mut pricing = self.resolve_pricing(&edit_input);

        let previous_rate = match (order.carrier, order.region_code) {
            (Some(carrier), Some(region)) => self
                .fee_calculator
                .rate_entry(carrier, region)
                .map(|_| (carrier, region)),
            _ => None,
        };

        let apply_fee = match previous_rate {
            Some((carrier, region)) => {
                if self.fee_calculator.is_table_fee(region, carrier, order.fee) {
                    true
                } else {
                    pricing.warnings.push(PricingWarning::ManualFeePreserved);
                    false
                }
            }
            None => !pricing.needs_manual_fee(),
        };

        if apply_fee && !same_fee(pricing.fee, order.fee) {
            info!(
                order_id = %order.id,
                from_fee = order.fee,
                to_fee = pricing.fee,
                tier = %pricing.tier,
                "编辑后运费重算"
            );
        }

        EditPricingPlan {
            order_id: order.id.clone(),
            pricing,
            apply_fee,
            previous_fee: order.fee,
        }
    }

    // ==========================================
    // 分桶对账
    // ==========================================

    /// 删除订单后对其腾出的 (承运商, 日期) 重算
    ///
    /// 删除必须已提交; 只做 normal → unique 的提升
    #[instrument(skip(self))]
    pub fn reconcile_bucket_after_deletion(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
    ) -> ReconcileResult {
        info!("删除后分桶重算");
        self.reconcile_bucket(carrier, date)
    }

    /// 幂等分桶对账
    ///
    /// 剩余订单上午、下午各不超过 1 单时,运费等于 normal_fee 且定义了
    /// unique_fee 的订单提升为 unique_fee; 运费与表值不符者视为人工改价跳过。
    /// 可在任意写入后安全重跑。
    #[instrument(skip(self))]
    pub fn reconcile_bucket(&self, carrier: CarrierName, date: NaiveDate) -> ReconcileResult {
        if !carrier.supports_unique_tier() {
            return ReconcileResult {
                verified: true,
                ..Default::default()
            };
        }

        self.bucket_locks
            .with_lock(carrier, date, || self.reconcile_locked(carrier, date))
    }

    // ==========================================
    // 内部方法
    // ==========================================

    /// 对账主流程（调用方负责加锁）
    fn reconcile_locked(&self, carrier: CarrierName, date: NaiveDate) -> ReconcileResult {
        if !carrier.supports_unique_tier() {
            return ReconcileResult {
                verified: true,
                ..Default::default()
            };
        }

        let orders: Vec<DeliveryOrder> = match self.store.list_orders(carrier, date) {
            Ok(orders) => orders
                .into_iter()
                .filter(|o| o.carrier == Some(carrier) && o.scheduled_date == date)
                .collect(),
            Err(e) => {
                warn!(error = %e, "订单列表不可用,跳过对账");
                return ReconcileResult::default();
            }
        };

        let morning = orders
            .iter()
            .filter(|o| o.time_slot == TimeSlot::Morning)
            .count();
        let afternoon = orders.len() - morning;

        let mut result = ReconcileResult {
            verified: true,
            ..Default::default()
        };

        if !bucket_pair_is_unique(morning, afternoon) {
            debug!(morning, afternoon, "分桶仍为 normal,无需提升");
            return result;
        }

        for order in &orders {
            let Some(region) = order.region_code else {
                continue;
            };
            let Some(entry) = self.fee_calculator.rate_entry(carrier, region) else {
                continue;
            };
            let Some(unique_fee) = entry.unique_fee else {
                continue;
            };

            if same_fee(order.fee, unique_fee) {
                continue;
            }
            if !same_fee(order.fee, entry.normal_fee) {
                debug!(order_id = %order.id, fee = order.fee, "人工改价,跳过提升");
                result.skipped_manual_order_ids.push(order.id.clone());
                continue;
            }

            match self.store.update_fee(&order.id, unique_fee) {
                Ok(()) => {
                    info!(
                        order_id = %order.id,
                        region = %region,
                        from_fee = order.fee,
                        to_fee = unique_fee,
                        "运费提升为独单价"
                    );
                    result.promoted_order_ids.push(order.id.clone());
                    self.event_publisher.publish(PricingEvent::FeePromoted {
                        order_id: order.id.clone(),
                        carrier,
                        date,
                        region,
                        from_fee: order.fee,
                        to_fee: unique_fee,
                    });
                }
                Err(e) => {
                    warn!(order_id = %order.id, error = %e, "运费写回失败,待下次对账");
                    result.verified = false;
                }
            }
        }

        self.event_publisher.publish(PricingEvent::BucketReconciled {
            carrier,
            date,
            promoted: result.promoted_order_ids.len(),
            skipped_manual: result.skipped_manual_order_ids.len(),
        });

        result
    }

    /// 解析区域与承运商（决定加哪把锁）
    fn locate(&self, input: &PricingInput) -> Located {
        let resolution = self.region_resolver.resolve(&input.city, &input.neighborhood);
        let carrier = self
            .carrier_assignor
            .assign_carrier(resolution.region, input.carrier_override);
        Located {
            resolution,
            carrier,
        }
    }

    /// 定价主流程（调用方负责加锁）
    fn price_located(&self, input: &PricingInput, located: Located) -> PricingResult {
        let mut warnings = Vec::new();

        let Located {
            resolution,
            carrier,
        } = located;
        if !resolution.city_mapped {
            warn!(city = %input.city, "城市未映射,需人工确认区域");
            warnings.push(PricingWarning::UnmappedCity);
        }
        let region = resolution.region;

        if carrier.is_none() {
            warnings.push(PricingWarning::CarrierUnassigned);
        }

        let decision = self.tier_resolver.decide_tier(
            self.store.as_ref(),
            carrier,
            input.date,
            input.slot,
            input.exclude_order_id.as_deref(),
        );
        if !decision.verified {
            warnings.push(PricingWarning::BucketCountUnavailable);
        }

        let quote = match carrier {
            Some(c) => self.fee_calculator.compute_fee(region, c, decision.tier),
            None => FeeQuote::unresolved(),
        };
        if !quote.resolved {
            warn!(region = %region, carrier = ?carrier, "费率表无记录,需人工录入运费");
            warnings.push(PricingWarning::FeeUnresolved);
        }

        debug!(
            region = %region,
            carrier = ?carrier,
            tier = %decision.tier,
            fee = quote.fee,
            "定价完成"
        );

        PricingResult {
            region,
            carrier,
            tier: decision.tier,
            fee: quote.fee,
            tier_verified: decision.verified,
            warnings,
        }
    }
}

/// 已解析的区域与承运商
#[derive(Debug, Clone, Copy)]
struct Located {
    resolution: RegionResolution,
    carrier: Option<CarrierName>,
}

// ==========================================
// BucketSession - 提交回调内的分桶操作
// ==========================================
// 由 resolve_pricing_and_commit 在持锁期间传入; 方法不再加锁
pub struct BucketSession<'a> {
    engine: &'a PricingEngine,
    carrier: Option<CarrierName>,
    date: NaiveDate,
}

impl BucketSession<'_> {
    pub fn carrier(&self) -> Option<CarrierName> {
        self.carrier
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// 在当前锁内重跑分桶对账（写入后调用）
    pub fn reconcile(&self) -> ReconcileResult {
        match self.carrier {
            Some(carrier) => self.engine.reconcile_locked(carrier, self.date),
            None => ReconcileResult {
                verified: true,
                ..Default::default()
            },
        }
    }
}
