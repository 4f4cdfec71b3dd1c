// ==========================================
// 药房配送协同系统 - 承运商分配器
// ==========================================
// 职责: 区域代码 → 默认承运商
// 规则:
// 1) region == OTHER → 人工指定值（可为空,由界面补录）
// 2) 其他 → 静态映射表（对非 OTHER 区域全覆盖）
// ==========================================

use crate::config::pricing_tables::RegionCarrierMap;
use crate::domain::types::{CarrierName, RegionCode};

#[derive(Debug, Clone)]
pub struct CarrierAssignor {
    region_carriers: RegionCarrierMap,
}

impl CarrierAssignor {
    pub fn new(region_carriers: RegionCarrierMap) -> Self {
        Self { region_carriers }
    }

    /// 分配承运商
    ///
    /// 人工指定只对 OTHER 区域生效; 已映射区域一律使用表值
    pub fn assign_carrier(
        &self,
        region: RegionCode,
        manual_override: Option<CarrierName>,
    ) -> Option<CarrierName> {
        if region.is_other() {
            return manual_override;
        }
        self.region_carriers.get(region)
    }
}
