// ==========================================
// 药房配送协同系统 - 定价配置读取 Trait
// ==========================================
// 职责: 定义定价引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::pricing_tables::{ConfigResult, PricingTables};
use async_trait::async_trait;

// ==========================================
// PricingConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PricingConfigReader: Send + Sync {
    /// 读取定价表
    ///
    /// # 返回
    /// - 已校验的 PricingTables
    ///
    /// # 默认值
    /// - 未配置时返回 PricingTables::builtin()
    async fn load_pricing_tables(&self) -> ConfigResult<PricingTables>;
}
