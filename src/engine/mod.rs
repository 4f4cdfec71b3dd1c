// ==========================================
// 药房配送协同系统 - 引擎层
// ==========================================
// 职责: 区域解析、承运商分配、运费计算、独单档判定与分桶对账
// 红线: Engine 不拼 SQL, 外部状态只经由 BucketCounter/OrderStore 读取
// ==========================================

pub mod bucket;
pub mod bucket_lock;
pub mod carrier_assignor;
pub mod events;
pub mod fee_calculator;
pub mod pricing_engine;
pub mod region_resolver;
pub mod unique_tier;

// 重导出核心引擎
pub use bucket::{BucketCounter, OrderStore};
pub use bucket_lock::{BucketLockHandle, BucketLocks};
pub use carrier_assignor::CarrierAssignor;
pub use events::{NoOpEventPublisher, OptionalEventPublisher, PricingEvent, PricingEventPublisher};
pub use fee_calculator::FeeCalculator;
pub use pricing_engine::{BucketSession, PricingEngine};
pub use region_resolver::{normalize_place_name, RegionResolution, RegionResolver};
pub use unique_tier::{bucket_pair_is_unique, tier_from_counts, UniqueTierResolver};
