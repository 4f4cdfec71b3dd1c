// ==========================================
// 药房配送协同系统 - 配送订单数据仓储
// ==========================================
// 职责: delivery_order 表的数据访问 + OrderStore 的 SQLite 实现
// 红线: Repository 不含业务逻辑,只负责数据访问
// 约束: 所有查询使用参数化
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::order::{DeliveryOrder, OrderId};
use crate::domain::types::{CarrierName, RegionCode, TimeSlot};
use crate::engine::bucket::{BucketCounter, OrderStore};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str =
    "SELECT order_id, carrier, region_code, scheduled_date, time_slot, fee FROM delivery_order";

/// 数据库原始行
struct OrderRow {
    order_id: String,
    carrier: Option<String>,
    region_code: Option<String>,
    scheduled_date: String,
    time_slot: String,
    fee: f64,
}

impl OrderRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            carrier: row.get(1)?,
            region_code: row.get(2)?,
            scheduled_date: row.get(3)?,
            time_slot: row.get(4)?,
            fee: row.get(5)?,
        })
    }

    fn into_order(self) -> RepositoryResult<DeliveryOrder> {
        let carrier = match self.carrier.as_deref() {
            Some(raw) => Some(CarrierName::from_str(raw).ok_or_else(|| {
                RepositoryError::FieldValueError {
                    field: "carrier".to_string(),
                    message: format!("未知承运商: {}", raw),
                }
            })?),
            None => None,
        };
        // 未知区域代码按 OTHER 处理（需人工录入运费）
        let region_code = self
            .region_code
            .as_deref()
            .map(|raw| RegionCode::from_str(raw).unwrap_or(RegionCode::Other));
        let scheduled_date = NaiveDate::parse_from_str(&self.scheduled_date, DATE_FORMAT)
            .map_err(|e| RepositoryError::FieldValueError {
                field: "scheduled_date".to_string(),
                message: format!("{}: {}", self.scheduled_date, e),
            })?;
        let time_slot =
            TimeSlot::from_str(&self.time_slot).ok_or_else(|| RepositoryError::FieldValueError {
                field: "time_slot".to_string(),
                message: format!("未知时段: {}", self.time_slot),
            })?;

        Ok(DeliveryOrder {
            id: self.order_id,
            carrier,
            region_code,
            scheduled_date,
            time_slot,
            fee: self.fee,
        })
    }
}

// ==========================================
// DeliveryOrderRepository - 配送订单仓储
// ==========================================
pub struct DeliveryOrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DeliveryOrderRepository {
    /// 创建新的仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增订单
    pub fn insert(&self, order: &DeliveryOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO delivery_order (
                order_id, carrier, region_code, scheduled_date, time_slot, fee
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                order.id,
                order.carrier.map(|c| c.to_db_str()),
                order.region_code.map(|r| r.to_db_str()),
                order.scheduled_date.format(DATE_FORMAT).to_string(),
                order.time_slot.to_db_str(),
                order.fee,
            ],
        )?;
        Ok(())
    }

    /// 整单更新（日期/时段/承运商/区域/运费）
    pub fn update(&self, order: &DeliveryOrder) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE delivery_order
            SET carrier = ?2, region_code = ?3, scheduled_date = ?4, time_slot = ?5,
                fee = ?6, updated_at = datetime('now')
            WHERE order_id = ?1
            "#,
            params![
                order.id,
                order.carrier.map(|c| c.to_db_str()),
                order.region_code.map(|r| r.to_db_str()),
                order.scheduled_date.format(DATE_FORMAT).to_string(),
                order.time_slot.to_db_str(),
                order.fee,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "DeliveryOrder".to_string(),
                id: order.id.clone(),
            });
        }
        Ok(())
    }

    /// 按主键查询
    ///
    /// # 返回
    /// - Ok(Some(DeliveryOrder)): 找到订单
    /// - Ok(None): 未找到
    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<DeliveryOrder>> {
        let conn = self.get_conn()?;
        let raw = conn
            .query_row(
                &format!("{} WHERE order_id = ?1", SELECT_COLUMNS),
                params![order_id],
                OrderRow::from_row,
            )
            .optional()?;

        raw.map(OrderRow::into_order).transpose()
    }

    /// 删除订单
    ///
    /// # 返回
    /// - Ok(Some(DeliveryOrder)): 被删除的订单（调用方据此触发分桶对账）
    /// - Ok(None): 订单不存在
    pub fn delete(&self, order_id: &str) -> RepositoryResult<Option<DeliveryOrder>> {
        let existing = self.find_by_id(order_id)?;
        if existing.is_some() {
            let conn = self.get_conn()?;
            conn.execute(
                "DELETE FROM delivery_order WHERE order_id = ?1",
                params![order_id],
            )?;
        }
        Ok(existing)
    }
}

impl BucketCounter for DeliveryOrderRepository {
    fn count_orders(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
        slot: TimeSlot,
        exclude_order_id: Option<&str>,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM delivery_order
            WHERE carrier = ?1 AND scheduled_date = ?2 AND time_slot = ?3
              AND (?4 IS NULL OR order_id <> ?4)
            "#,
            params![
                carrier.to_db_str(),
                date.format(DATE_FORMAT).to_string(),
                slot.to_db_str(),
                exclude_order_id,
            ],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl OrderStore for DeliveryOrderRepository {
    fn list_orders(
        &self,
        carrier: CarrierName,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<DeliveryOrder>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE carrier = ?1 AND scheduled_date = ?2 ORDER BY time_slot DESC, order_id ASC",
            SELECT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(
                params![carrier.to_db_str(), date.format(DATE_FORMAT).to_string()],
                OrderRow::from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    fn update_fee(&self, order_id: &OrderId, fee: f64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE delivery_order SET fee = ?2, updated_at = datetime('now') WHERE order_id = ?1",
            params![order_id, fee],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "DeliveryOrder".to_string(),
                id: order_id.clone(),
            });
        }
        Ok(())
    }
}
