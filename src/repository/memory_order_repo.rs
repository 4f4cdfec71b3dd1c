// ==========================================
// 药房配送协同系统 - 内存订单仓储
// ==========================================
// 职责: OrderStore 的进程内实现（嵌入式调用方/测试使用）
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::order::{DeliveryOrder, OrderId};
use crate::domain::types::{CarrierName, TimeSlot};
use crate::engine::bucket::{BucketCounter, OrderStore};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<OrderId, DeliveryOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_orders(&self) -> RepositoryResult<MutexGuard<'_, HashMap<OrderId, DeliveryOrder>>> {
        self.orders
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增订单（ID 重复报错）
    pub fn insert(&self, order: DeliveryOrder) -> RepositoryResult<()> {
        let mut orders = self.get_orders()?;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::UniqueConstraintViolation(format!(
                "delivery_order.order_id={}",
                order.id
            )));
        }
        orders.insert(order.id.clone(), order);
        Ok(())
    }

    pub fn remove(&self, order_id: &str) -> RepositoryResult<Option<DeliveryOrder>> {
        Ok(self.get_orders()?.remove(order_id))
    }

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<DeliveryOrder>> {
        Ok(self.get_orders()?.get(order_id).cloned())
    }

    pub fn len(&self) -> RepositoryResult<usize> {
        Ok(self.get_orders()?.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

impl BucketCounter for InMemoryOrderStore {
    fn count_orders(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
        slot: TimeSlot,
        exclude_order_id: Option<&str>,
    ) -> RepositoryResult<usize> {
        let orders = self.get_orders()?;
        Ok(orders
            .values()
            .filter(|o| {
                o.carrier == Some(carrier)
                    && o.scheduled_date == date
                    && o.time_slot == slot
                    && Some(o.id.as_str()) != exclude_order_id
            })
            .count())
    }
}

impl OrderStore for InMemoryOrderStore {
    fn list_orders(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<DeliveryOrder>> {
        let orders = self.get_orders()?;
        let mut listed: Vec<DeliveryOrder> = orders
            .values()
            .filter(|o| o.carrier == Some(carrier) && o.scheduled_date == date)
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.time_slot.cmp(&b.time_slot).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }

    fn update_fee(&self, order_id: &OrderId, fee: f64) -> RepositoryResult<()> {
        let mut orders = self.get_orders()?;
        match orders.get_mut(order_id) {
            Some(order) => {
                order.fee = fee;
                Ok(())
            }
            None => Err(RepositoryError::NotFound {
                entity: "DeliveryOrder".to_string(),
                id: order_id.clone(),
            }),
        }
    }
}
