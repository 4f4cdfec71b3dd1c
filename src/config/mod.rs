// ==========================================
// 药房配送协同系统 - 配置层
// ==========================================
// 职责: 定价表定义、校验与持久化
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod pricing_config_trait;
pub mod pricing_tables;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use pricing_config_trait::PricingConfigReader;
pub use pricing_tables::{
    CityRegionEntry, CityRegionMap, ConfigError, ConfigResult, PricingTables, RateEntry,
    RateTable, RegionCarrierMap,
};
