// ==========================================
// 药房配送协同系统 - 定价输入/输出模型
// ==========================================
// 职责: 定义定价引擎对外的输入、输出与降级告警
// 红线: 业务结果（未映射城市/无费率/计数不可用）不是错误,以告警返回
// ==========================================

use crate::domain::order::OrderId;
use crate::domain::types::{CarrierName, PricingTier, RegionCode, TimeSlot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// PricingWarning - 定价降级告警
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingWarning {
    UnmappedCity,           // 城市未映射,区域降级为 OTHER
    CarrierUnassigned,      // OTHER 区域且未人工指定承运商
    FeeUnresolved,          // 费率表无记录,需人工录入运费
    BucketCountUnavailable, // 分桶计数失败,价格档降级为 normal（未核实）
    ManualFeePreserved,     // 人工改价,重算不覆盖
}

impl fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingWarning::UnmappedCity => write!(f, "UNMAPPED_CITY"),
            PricingWarning::CarrierUnassigned => write!(f, "CARRIER_UNASSIGNED"),
            PricingWarning::FeeUnresolved => write!(f, "FEE_UNRESOLVED"),
            PricingWarning::BucketCountUnavailable => write!(f, "BUCKET_COUNT_UNAVAILABLE"),
            PricingWarning::ManualFeePreserved => write!(f, "MANUAL_FEE_PRESERVED"),
        }
    }
}

// ==========================================
// FeeQuote - 查表结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    pub fee: f64,
    /// 无费率记录时为 false,fee 固定为 0
    pub resolved: bool,
}

impl FeeQuote {
    pub fn resolved(fee: f64) -> Self {
        Self { fee, resolved: true }
    }

    pub fn unresolved() -> Self {
        Self {
            fee: 0.0,
            resolved: false,
        }
    }
}

// ==========================================
// TierDecision - 价格档判定结果
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierDecision {
    pub tier: PricingTier,
    /// 计数是否成功读取; false 表示降级为 normal
    pub verified: bool,
    pub morning_count: Option<usize>,
    pub afternoon_count: Option<usize>,
}

impl TierDecision {
    /// 不参与独单判定的承运商
    pub fn not_applicable() -> Self {
        Self {
            tier: PricingTier::Normal,
            verified: true,
            morning_count: None,
            afternoon_count: None,
        }
    }

    /// 计数不可用时的安全默认
    pub fn unverified() -> Self {
        Self {
            tier: PricingTier::Normal,
            verified: false,
            morning_count: None,
            afternoon_count: None,
        }
    }
}

// ==========================================
// PricingInput - 定价请求
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub city: String,
    pub neighborhood: String,
    pub carrier_override: Option<CarrierName>,
    pub date: NaiveDate,
    pub slot: TimeSlot,
    /// 编辑已有订单时传入,计数排除自身
    pub exclude_order_id: Option<OrderId>,
}

// ==========================================
// PricingResult - 定价结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub region: RegionCode,
    pub carrier: Option<CarrierName>,
    pub tier: PricingTier,
    pub fee: f64,
    /// 价格档是否经过分桶计数核实
    pub tier_verified: bool,
    pub warnings: Vec<PricingWarning>,
}

impl PricingResult {
    pub fn has_warning(&self, warning: PricingWarning) -> bool {
        self.warnings.contains(&warning)
    }

    /// 运费是否需要人工录入
    pub fn needs_manual_fee(&self) -> bool {
        self.has_warning(PricingWarning::FeeUnresolved)
    }
}

// ==========================================
// EditPricingPlan - 编辑重算方案
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditPricingPlan {
    pub order_id: OrderId,
    pub pricing: PricingResult,
    /// 调用方是否应以 pricing.fee 覆盖订单运费
    pub apply_fee: bool,
    /// 编辑前订单持有的运费
    pub previous_fee: f64,
}

impl EditPricingPlan {
    /// 调用方最终应保存的运费
    pub fn fee_to_store(&self) -> f64 {
        if self.apply_fee {
            self.pricing.fee
        } else {
            self.previous_fee
        }
    }
}

// ==========================================
// ReconcileResult - 分桶对账结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    /// 运费被提升到独单档的订单
    pub promoted_order_ids: Vec<OrderId>,
    /// 因人工改价被跳过的订单
    pub skipped_manual_order_ids: Vec<OrderId>,
    /// 是否完成核实（存储不可用时为 false）
    pub verified: bool,
}

/// 运费比较（按分取整）
///
/// 相差不足半分视为同一运费: 7.004 与 7.00 相同, 7.01 不同
pub fn same_fee(a: f64, b: f64) -> bool {
    (a * 100.0).round() as i64 == (b * 100.0).round() as i64
}
