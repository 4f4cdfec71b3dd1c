// ==========================================
// 药房配送协同系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、定价输入输出
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod order;
pub mod place_name;
pub mod pricing;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use order::{DeliveryOrder, OrderId};
pub use place_name::normalize_place_name;
pub use pricing::{
    same_fee, EditPricingPlan, FeeQuote, PricingInput, PricingResult,
    PricingWarning, ReconcileResult, TierDecision,
};
pub use types::{CarrierName, PricingTier, RegionCode, TimeSlot};
