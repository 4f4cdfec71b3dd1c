// ==========================================
// 药房配送协同系统 - 定价事件发布
// ==========================================
// 职责: 定义定价事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，Repository 层实现审计落库
// ==========================================

use crate::domain::order::OrderId;
use crate::domain::types::{CarrierName, RegionCode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 定价事件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PricingEvent {
    /// 订单运费被提升到独单价
    FeePromoted {
        order_id: OrderId,
        carrier: CarrierName,
        date: NaiveDate,
        region: RegionCode,
        from_fee: f64,
        to_fee: f64,
    },
    /// 分桶对账完成
    BucketReconciled {
        carrier: CarrierName,
        date: NaiveDate,
        promoted: usize,
        skipped_manual: usize,
    },
}

impl PricingEvent {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            PricingEvent::FeePromoted { .. } => "FeePromoted",
            PricingEvent::BucketReconciled { .. } => "BucketReconciled",
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 定价事件发布者
///
/// # 实现说明
/// - `ActionLogRepository` 实现此 trait,将事件写入 action_log
pub trait PricingEventPublisher: Send + Sync {
    fn publish(&self, event: PricingEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl PricingEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: PricingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::debug!("NoOpEventPublisher: 跳过事件发布 - event_type={}", event.as_str());
        Ok(())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn PricingEventPublisher>> 的使用
#[derive(Clone, Default)]
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn PricingEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn PricingEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    ///
    /// 审计失败只记日志,不影响定价结果
    pub fn publish(&self, event: PricingEvent) {
        let Some(publisher) = &self.inner else {
            return;
        };
        let event_type = event.as_str().to_string();
        if let Err(e) = publisher.publish(event) {
            tracing::warn!(event_type = %event_type, error = %e, "定价事件发布失败");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}
