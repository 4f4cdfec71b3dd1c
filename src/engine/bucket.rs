// ==========================================
// 药房配送协同系统 - 分桶计数契约
// ==========================================
// 职责: 定义引擎读取/写回外部订单存储的接口（依赖倒置）
// 说明: Engine 层定义 trait，Repository 层实现
// 红线: 这是引擎唯一读取外部状态的入口; 实现必须幂等、可重试
// ==========================================

use crate::domain::order::{DeliveryOrder, OrderId};
use crate::domain::types::{CarrierName, TimeSlot};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDate;

/// 分桶计数器
///
/// 统计 (承运商, 日期, 时段) 内的订单数,可排除指定订单
/// （编辑/删除时询问“除自己以外还有几单”）
pub trait BucketCounter: Send + Sync {
    fn count_orders(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
        slot: TimeSlot,
        exclude_order_id: Option<&str>,
    ) -> RepositoryResult<usize>;
}

/// 订单存储（对账所需的读写接口）
///
/// list_orders / update_fee 仅在分桶对账中使用
pub trait OrderStore: BucketCounter {
    /// 查询某承运商某日全部订单（上午+下午）
    fn list_orders(&self, carrier: CarrierName, date: NaiveDate)
        -> RepositoryResult<Vec<DeliveryOrder>>;

    /// 写回运费
    fn update_fee(&self, order_id: &OrderId, fee: f64) -> RepositoryResult<()>;
}
