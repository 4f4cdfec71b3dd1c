// ==========================================
// 药房配送协同系统 - 独单价格档判定
// ==========================================
// 职责: 判定 (CarrierB, 日期, 时段) 是否适用独单档
// 红线: 不存状态,每次按需从 count_orders 重算
// ==========================================
// 判定规则:
// - 非 CarrierB → normal
// - target = 目标时段其他订单数, other = 另一时段其他订单数
// - unique ⇔ target == 0 且 other ∈ {0, 1}
// - 计数失败 → normal（未核实）,不猜测、不抛错
// ==========================================

use crate::domain::pricing::TierDecision;
use crate::domain::types::{CarrierName, PricingTier, TimeSlot};
use crate::engine::bucket::BucketCounter;
use chrono::NaiveDate;
use tracing::{instrument, warn};

/// 由两个时段的计数得出价格档
///
/// 只看目标时段不够: 上午 1 单、下午 5 单的日期不是“轻载日”
pub fn tier_from_counts(target_count: usize, other_count: usize) -> PricingTier {
    let would_be_unique_in_target = target_count == 0;
    let other_slot_qualifies = other_count <= 1;

    if would_be_unique_in_target && other_slot_qualifies {
        PricingTier::Unique
    } else {
        PricingTier::Normal
    }
}

/// 订单剩余集合是否整体满足独单条件（对账用）
///
/// 对集合中任一订单排除自身后: 本时段 0 单、另一时段 ≤1 单,
/// 等价于上午、下午各不超过 1 单
pub fn bucket_pair_is_unique(morning_count: usize, afternoon_count: usize) -> bool {
    morning_count <= 1 && afternoon_count <= 1
}

// ==========================================
// UniqueTierResolver - 独单档判定器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct UniqueTierResolver;

impl UniqueTierResolver {
    pub fn new() -> Self {
        Self
    }

    /// 判定价格档
    ///
    /// # 参数
    /// - `carrier`: 承运商（None 视为不适用）
    /// - `exclude_order_id`: 编辑中的订单ID; 新建订单传 None
    #[instrument(skip(self, counter))]
    pub fn decide_tier(
        &self,
        counter: &dyn BucketCounter,
        carrier: Option<CarrierName>,
        date: NaiveDate,
        slot: TimeSlot,
        exclude_order_id: Option<&str>,
    ) -> TierDecision {
        let carrier = match carrier {
            Some(c) if c.supports_unique_tier() => c,
            _ => return TierDecision::not_applicable(),
        };

        let target = counter.count_orders(carrier, date, slot, exclude_order_id);
        let other = counter.count_orders(carrier, date, slot.other(), exclude_order_id);

        let (target, other) = match (target, other) {
            (Ok(t), Ok(o)) => (t, o),
            (Err(e), _) | (_, Err(e)) => {
                warn!(
                    carrier = %carrier,
                    date = %date,
                    error = %e,
                    "分桶计数不可用,价格档降级为 normal"
                );
                return TierDecision::unverified();
            }
        };

        let (morning_count, afternoon_count) = match slot {
            TimeSlot::Morning => (target, other),
            TimeSlot::Afternoon => (other, target),
        };

        TierDecision {
            tier: tier_from_counts(target, other),
            verified: true,
            morning_count: Some(morning_count),
            afternoon_count: Some(afternoon_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use std::collections::HashMap;

    /// 固定计数的计数器
    struct FixedCounter {
        counts: HashMap<TimeSlot, usize>,
    }

    impl FixedCounter {
        fn new(morning: usize, afternoon: usize) -> Self {
            let mut counts = HashMap::new();
            counts.insert(TimeSlot::Morning, morning);
            counts.insert(TimeSlot::Afternoon, afternoon);
            Self { counts }
        }
    }

    impl BucketCounter for FixedCounter {
        fn count_orders(
            &self,
            _carrier: CarrierName,
            _date: NaiveDate,
            slot: TimeSlot,
            _exclude_order_id: Option<&str>,
        ) -> RepositoryResult<usize> {
            Ok(self.counts[&slot])
        }
    }

    struct BrokenCounter;

    impl BucketCounter for BrokenCounter {
        fn count_orders(
            &self,
            _carrier: CarrierName,
            _date: NaiveDate,
            _slot: TimeSlot,
            _exclude_order_id: Option<&str>,
        ) -> RepositoryResult<usize> {
            Err(RepositoryError::DatabaseConnectionError("store offline".to_string()))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_tier_from_counts_table() {
        assert_eq!(tier_from_counts(0, 0), PricingTier::Unique);
        assert_eq!(tier_from_counts(0, 1), PricingTier::Unique);
        assert_eq!(tier_from_counts(0, 2), PricingTier::Normal);
        assert_eq!(tier_from_counts(1, 0), PricingTier::Normal);
        assert_eq!(tier_from_counts(1, 1), PricingTier::Normal);
    }

    #[test]
    fn test_empty_day_is_unique() {
        let resolver = UniqueTierResolver::new();
        let decision = resolver.decide_tier(
            &FixedCounter::new(0, 0),
            Some(CarrierName::CarrierB),
            date(),
            TimeSlot::Morning,
            None,
        );
        assert_eq!(decision.tier, PricingTier::Unique);
        assert!(decision.verified);
    }

    #[test]
    fn test_busy_other_slot_disqualifies_day() {
        let resolver = UniqueTierResolver::new();
        let decision = resolver.decide_tier(
            &FixedCounter::new(0, 2),
            Some(CarrierName::CarrierB),
            date(),
            TimeSlot::Morning,
            None,
        );
        assert_eq!(decision.tier, PricingTier::Normal);
        assert_eq!(decision.afternoon_count, Some(2));
    }

    #[test]
    fn test_afternoon_target_uses_afternoon_count() {
        let resolver = UniqueTierResolver::new();
        let decision = resolver.decide_tier(
            &FixedCounter::new(1, 0),
            Some(CarrierName::CarrierB),
            date(),
            TimeSlot::Afternoon,
            None,
        );
        assert_eq!(decision.tier, PricingTier::Unique);
        assert_eq!(decision.morning_count, Some(1));
        assert_eq!(decision.afternoon_count, Some(0));

        let decision = resolver.decide_tier(
            &FixedCounter::new(1, 0),
            Some(CarrierName::CarrierB),
            date(),
            TimeSlot::Morning,
            None,
        );
        assert_eq!(decision.tier, PricingTier::Normal);
    }

    #[test]
    fn test_carrier_a_is_always_normal() {
        let resolver = UniqueTierResolver::new();
        let decision = resolver.decide_tier(
            &BrokenCounter,
            Some(CarrierName::CarrierA),
            date(),
            TimeSlot::Morning,
            None,
        );
        assert_eq!(decision, TierDecision::not_applicable());

        let decision =
            resolver.decide_tier(&BrokenCounter, None, date(), TimeSlot::Morning, None);
        assert_eq!(decision.tier, PricingTier::Normal);
    }

    #[test]
    fn test_count_failure_degrades_to_normal() {
        let resolver = UniqueTierResolver::new();
        let decision = resolver.decide_tier(
            &BrokenCounter,
            Some(CarrierName::CarrierB),
            date(),
            TimeSlot::Morning,
            None,
        );
        assert_eq!(decision.tier, PricingTier::Normal);
        assert!(!decision.verified);
    }

    #[test]
    fn test_bucket_pair_is_unique() {
        assert!(bucket_pair_is_unique(1, 1));
        assert!(bucket_pair_is_unique(0, 1));
        assert!(!bucket_pair_is_unique(2, 1));
        assert!(!bucket_pair_is_unique(1, 2));
    }
}
