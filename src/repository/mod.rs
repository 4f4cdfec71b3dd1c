// ==========================================
// 药房配送协同系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供订单存储契约的参考实现与审计日志
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod error;
pub mod memory_order_repo;
pub mod order_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use memory_order_repo::InMemoryOrderStore;
pub use order_repo::DeliveryOrderRepository;
