// ==========================================
// 药房配送协同系统 - 配送订单领域模型
// ==========================================
// 红线: 订单由外部存储持有,引擎只读取定价相关字段
// ==========================================

use crate::domain::types::{CarrierName, RegionCode, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 订单ID
pub type OrderId = String;

// ==========================================
// DeliveryOrder - 配送订单
// ==========================================
// 仅包含定价引擎关心的字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOrder {
    pub id: OrderId,                     // 订单ID
    pub carrier: Option<CarrierName>,    // 承运商 (OTHER 区域且未人工指定时为空)
    pub region_code: Option<RegionCode>, // 区域代码
    pub scheduled_date: NaiveDate,       // 配送日期
    pub time_slot: TimeSlot,             // 配送时段
    pub fee: f64,                        // 运费
}
