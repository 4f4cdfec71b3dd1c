// ==========================================
// 药房配送协同系统 - 领域类型定义
// ==========================================
// 红线: 区域/承运商/时段/价格档均为封闭枚举,不接受自由文本
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 区域代码 (Region Code)
// ==========================================
// OTHER 为哨兵值: 无法查表,运费需人工录入
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegionCode {
    Bc,            // 巴尔内阿里奥坎布里乌 (市区)
    NovaEsperanca, // 新埃斯佩兰萨
    Barra,         // 巴拉
    Estaleiro,     // 埃斯塔莱罗
    Camboriu,      // 坎布里乌
    Itajai,        // 伊塔雅伊
    Navegantes,    // 纳韦甘特斯
    Itapema,       // 伊塔佩马
    Other,         // 未映射
}

impl RegionCode {
    /// 全部区域代码（含 OTHER）
    pub const ALL: [RegionCode; 9] = [
        RegionCode::Bc,
        RegionCode::NovaEsperanca,
        RegionCode::Barra,
        RegionCode::Estaleiro,
        RegionCode::Camboriu,
        RegionCode::Itajai,
        RegionCode::Navegantes,
        RegionCode::Itapema,
        RegionCode::Other,
    ];

    /// 是否为哨兵值 OTHER
    pub fn is_other(&self) -> bool {
        matches!(self, RegionCode::Other)
    }

    /// 从字符串解析区域代码
    ///
    /// 未知代码返回 None（调用方决定是否降级为 OTHER）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BC" => Some(RegionCode::Bc),
            "NOVA_ESPERANCA" => Some(RegionCode::NovaEsperanca),
            "BARRA" => Some(RegionCode::Barra),
            "ESTALEIRO" => Some(RegionCode::Estaleiro),
            "CAMBORIU" => Some(RegionCode::Camboriu),
            "ITAJAI" => Some(RegionCode::Itajai),
            "NAVEGANTES" => Some(RegionCode::Navegantes),
            "ITAPEMA" => Some(RegionCode::Itapema),
            "OTHER" => Some(RegionCode::Other),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RegionCode::Bc => "BC",
            RegionCode::NovaEsperanca => "NOVA_ESPERANCA",
            RegionCode::Barra => "BARRA",
            RegionCode::Estaleiro => "ESTALEIRO",
            RegionCode::Camboriu => "CAMBORIU",
            RegionCode::Itajai => "ITAJAI",
            RegionCode::Navegantes => "NAVEGANTES",
            RegionCode::Itapema => "ITAPEMA",
            RegionCode::Other => "OTHER",
        }
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 承运商 (Carrier)
// ==========================================
// 固定两家快递员; 仅 CarrierB 支持独单价格档
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarrierName {
    CarrierA,
    CarrierB,
}

impl CarrierName {
    /// 是否支持独单价格档
    pub fn supports_unique_tier(&self) -> bool {
        matches!(self, CarrierName::CarrierB)
    }

    /// 从字符串解析承运商
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CARRIER_A" => Some(CarrierName::CarrierA),
            "CARRIER_B" => Some(CarrierName::CarrierB),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            CarrierName::CarrierA => "CARRIER_A",
            CarrierName::CarrierB => "CARRIER_B",
        }
    }
}

impl fmt::Display for CarrierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 配送时段 (Time Slot)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    Morning,   // 上午
    Afternoon, // 下午
}

impl TimeSlot {
    /// 同一天的另一个时段
    pub fn other(&self) -> Self {
        match self {
            TimeSlot::Morning => TimeSlot::Afternoon,
            TimeSlot::Afternoon => TimeSlot::Morning,
        }
    }

    /// 从字符串解析时段（兼容大小写）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MORNING" => Some(TimeSlot::Morning),
            "AFTERNOON" => Some(TimeSlot::Afternoon),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "Morning",
            TimeSlot::Afternoon => "Afternoon",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 价格档 (Pricing Tier)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    Normal, // 普通档
    Unique, // 独单档（溢价）
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingTier::Normal => write!(f, "normal"),
            PricingTier::Unique => write!(f, "unique"),
        }
    }
}
