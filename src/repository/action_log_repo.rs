// ==========================================
// 药房配送协同系统 - 操作日志数据仓储
// ==========================================
// 职责: action_log 表读写; 作为定价事件的审计落库实现
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::engine::events::{PricingEvent, PricingEventPublisher};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde_json::json;
use std::error::Error;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// 引擎自动写入的操作人
pub const SYSTEM_ACTOR: &str = "system";

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO action_log (
                action_id, action_type, action_ts, actor,
                order_id, carrier, scheduled_date, payload_json, detail
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                log.action_id,
                log.action_type,
                log.action_ts.format(TS_FORMAT).to_string(),
                log.actor,
                log.order_id,
                log.carrier,
                log.scheduled_date.map(|d| d.format(DATE_FORMAT).to_string()),
                log.payload_json.as_ref().map(|v| v.to_string()),
                log.detail,
            ],
        )?;

        Ok(log.action_id.clone())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询订单的全部日志（时间升序）
    pub fn find_by_order_id(&self, order_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor,
                   order_id, carrier, scheduled_date, payload_json, detail
            FROM action_log
            WHERE order_id = ?1
            ORDER BY action_ts ASC, action_id ASC
            "#,
        )?;

        let logs = stmt
            .query_map(params![order_id], map_action_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// 查询某操作类型的日志
    pub fn find_by_action_type(&self, action_type: ActionType) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT action_id, action_type, action_ts, actor,
                   order_id, carrier, scheduled_date, payload_json, detail
            FROM action_log
            WHERE action_type = ?1
            ORDER BY action_ts ASC, action_id ASC
            "#,
        )?;

        let logs = stmt
            .query_map(params![action_type.to_string()], map_action_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }
}

fn map_action_log(row: &Row<'_>) -> rusqlite::Result<ActionLog> {
    let ts_raw: String = row.get(2)?;
    Ok(ActionLog {
        action_id: row.get(0)?,
        action_type: row.get(1)?,
        action_ts: NaiveDateTime::parse_from_str(&ts_raw, TS_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        actor: row.get(3)?,
        order_id: row.get(4)?,
        carrier: row.get(5)?,
        scheduled_date: row
            .get::<_, Option<String>>(6)?
            .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        payload_json: row
            .get::<_, Option<String>>(7)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        detail: row.get(8)?,
    })
}

/// 定价事件 → 操作日志
fn event_to_log(event: &PricingEvent) -> ActionLog {
    let now = Utc::now().naive_utc();
    let action_id = Uuid::new_v4().to_string();

    match event {
        PricingEvent::FeePromoted {
            order_id,
            carrier,
            date,
            region,
            from_fee,
            to_fee,
        } => ActionLog {
            action_id,
            action_type: ActionType::FeePromoted.to_string(),
            action_ts: now,
            actor: SYSTEM_ACTOR.to_string(),
            order_id: Some(order_id.clone()),
            carrier: Some(carrier.to_string()),
            scheduled_date: Some(*date),
            payload_json: Some(json!({
                "region": region.to_db_str(),
                "from_fee": from_fee,
                "to_fee": to_fee,
            })),
            detail: Some(format!("运费 {:.2} → {:.2}（独单价）", from_fee, to_fee)),
        },
        PricingEvent::BucketReconciled {
            carrier,
            date,
            promoted,
            skipped_manual,
        } => ActionLog {
            action_id,
            action_type: ActionType::BucketReconcile.to_string(),
            action_ts: now,
            actor: SYSTEM_ACTOR.to_string(),
            order_id: None,
            carrier: Some(carrier.to_string()),
            scheduled_date: Some(*date),
            payload_json: Some(json!({
                "promoted": promoted,
                "skipped_manual": skipped_manual,
            })),
            detail: None,
        },
    }
}

impl PricingEventPublisher for ActionLogRepository {
    fn publish(&self, event: PricingEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.insert(&event_to_log(&event))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{CarrierName, RegionCode};

    fn setup_repo() -> ActionLogRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ActionLogRepository::new(Arc::new(Mutex::new(conn)))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
    }

    #[test]
    fn test_publish_fee_promoted_writes_log() {
        let repo = setup_repo();
        repo.publish(PricingEvent::FeePromoted {
            order_id: "o1".to_string(),
            carrier: CarrierName::CarrierB,
            date: date(),
            region: RegionCode::Bc,
            from_fee: 7.0,
            to_fee: 12.0,
        })
        .unwrap();

        let logs = repo.find_by_order_id("o1").unwrap();
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert_eq!(log.action_type, "FeePromoted");
        assert_eq!(log.actor, SYSTEM_ACTOR);
        assert_eq!(log.carrier.as_deref(), Some("CARRIER_B"));
        assert_eq!(log.scheduled_date, Some(date()));
        let payload = log.payload_json.as_ref().unwrap();
        assert_eq!(payload["to_fee"], json!(12.0));
    }

    #[test]
    fn test_publish_bucket_reconciled() {
        let repo = setup_repo();
        repo.publish(PricingEvent::BucketReconciled {
            carrier: CarrierName::CarrierB,
            date: date(),
            promoted: 2,
            skipped_manual: 1,
        })
        .unwrap();

        let logs = repo.find_by_action_type(ActionType::BucketReconcile).unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].order_id.is_none());
        assert_eq!(logs[0].payload_json.as_ref().unwrap()["skipped_manual"], json!(1));
    }
}
