// ==========================================
// 药房配送协同系统 - 核心库
// ==========================================
// 范围: 配送定价与区域解析引擎
// 技术栈: Rust + SQLite
// 系统定位: 定价决策支持 (人工可覆盖运费与承运商)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 定价规则
pub mod engine;

// 导入层 - 外部费率数据
pub mod importer;

// 配置层 - 定价表
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CarrierName, PricingTier, RegionCode, TimeSlot};

// 领域实体
pub use domain::{
    ActionLog, ActionType, DeliveryOrder, EditPricingPlan, PricingInput, PricingResult,
    PricingWarning, ReconcileResult,
};

// 配置
pub use config::{ConfigManager, PricingConfigReader, PricingTables};

// 引擎
pub use engine::{BucketCounter, OrderStore, PricingEngine};

// 仓储
pub use repository::{ActionLogRepository, DeliveryOrderRepository, InMemoryOrderStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "药房配送协同系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_builtin_tables_build_engine() {
        let store = std::sync::Arc::new(InMemoryOrderStore::new());
        assert!(PricingEngine::new(PricingTables::builtin(), store).is_ok());
    }
}
