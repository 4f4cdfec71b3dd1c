// ==========================================
// 药房配送协同系统 - 运费计算器
// ==========================================
// 职责: (区域, 承运商, 价格档) → 运费
// 规则:
// 1) OTHER 或无费率记录 → 0 + FeeUnresolved（需人工录入,非致命）
// 2) unique 档但未定义 unique_fee → 回退 normal_fee（不得返回 0）
// 3) 其他 → 表值
// ==========================================

use crate::config::pricing_tables::{RateEntry, RateTable};
use crate::domain::pricing::{same_fee, FeeQuote};
use crate::domain::types::{CarrierName, PricingTier, RegionCode};

#[derive(Debug, Clone)]
pub struct FeeCalculator {
    rates: RateTable,
}

impl FeeCalculator {
    pub fn new(rates: RateTable) -> Self {
        Self { rates }
    }

    /// 费率记录
    pub fn rate_entry(&self, carrier: CarrierName, region: RegionCode) -> Option<&RateEntry> {
        self.rates.get(carrier, region)
    }

    /// 计算运费
    pub fn compute_fee(
        &self,
        region: RegionCode,
        carrier: CarrierName,
        tier: PricingTier,
    ) -> FeeQuote {
        let entry = match self.rate_entry(carrier, region) {
            Some(entry) => entry,
            None => return FeeQuote::unresolved(),
        };

        match (tier, entry.unique_fee) {
            (PricingTier::Unique, Some(unique_fee)) => FeeQuote::resolved(unique_fee),
            _ => FeeQuote::resolved(entry.normal_fee),
        }
    }

    /// 运费是否由费率表派生（等于 normal 或 unique 表值）
    ///
    /// 与表值不等即视为人工改价
    pub fn is_table_fee(&self, region: RegionCode, carrier: CarrierName, fee: f64) -> bool {
        match self.rate_entry(carrier, region) {
            Some(entry) => {
                same_fee(fee, entry.normal_fee)
                    || entry.unique_fee.map_or(false, |u| same_fee(fee, u))
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::pricing_tables::PricingTables;

    fn calculator() -> FeeCalculator {
        FeeCalculator::new(PricingTables::builtin().rates)
    }

    #[test]
    fn test_normal_and_unique_fee() {
        let calc = calculator();
        assert_eq!(
            calc.compute_fee(RegionCode::Bc, CarrierName::CarrierB, PricingTier::Normal),
            FeeQuote::resolved(7.0)
        );
        assert_eq!(
            calc.compute_fee(RegionCode::Bc, CarrierName::CarrierB, PricingTier::Unique),
            FeeQuote::resolved(12.0)
        );
    }

    #[test]
    fn test_unique_without_unique_fee_falls_back_to_normal() {
        let calc = calculator();
        assert_eq!(
            calc.compute_fee(RegionCode::Bc, CarrierName::CarrierA, PricingTier::Unique),
            FeeQuote::resolved(8.0)
        );
        assert_eq!(
            calc.compute_fee(RegionCode::Estaleiro, CarrierName::CarrierB, PricingTier::Unique),
            FeeQuote::resolved(15.0)
        );
    }

    #[test]
    fn test_other_region_is_unresolved() {
        let calc = calculator();
        for carrier in [CarrierName::CarrierA, CarrierName::CarrierB] {
            for tier in [PricingTier::Normal, PricingTier::Unique] {
                let quote = calc.compute_fee(RegionCode::Other, carrier, tier);
                assert_eq!(quote.fee, 0.0);
                assert!(!quote.resolved);
            }
        }
    }

    #[test]
    fn test_missing_entry_is_unresolved() {
        let calc = calculator();
        let quote = calc.compute_fee(RegionCode::Itajai, CarrierName::CarrierB, PricingTier::Normal);
        assert_eq!(quote, FeeQuote::unresolved());
    }

    #[test]
    fn test_is_table_fee() {
        let calc = calculator();
        assert!(calc.is_table_fee(RegionCode::Bc, CarrierName::CarrierB, 7.0));
        assert!(calc.is_table_fee(RegionCode::Bc, CarrierName::CarrierB, 12.0));
        assert!(!calc.is_table_fee(RegionCode::Bc, CarrierName::CarrierB, 99.0));
        assert!(!calc.is_table_fee(RegionCode::Other, CarrierName::CarrierB, 0.0));
    }
}
