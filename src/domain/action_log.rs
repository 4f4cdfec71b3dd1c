// ==========================================
// 药房配送协同系统 - 运费操作日志领域模型
// ==========================================
// 红线: 引擎自动改价必须留痕
// 用途: 审计追踪（谁在何时把哪张订单的运费改成了多少）
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
// 对齐: action_log 表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,             // 日志ID
    pub action_type: String,           // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime,      // 操作时间戳
    pub actor: String,                 // 操作人（引擎写入为 "system"）
    pub order_id: Option<String>,      // 关联订单
    pub carrier: Option<String>,       // 承运商
    pub scheduled_date: Option<NaiveDate>, // 配送日期
    pub payload_json: Option<JsonValue>,   // 操作参数 (JSON)
    pub detail: Option<String>,        // 详细描述
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    FeePromoted,     // 删除/对账后提升到独单价
    BucketReconcile, // 分桶对账完成
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::FeePromoted => write!(f, "FeePromoted"),
            ActionType::BucketReconcile => write!(f, "BucketReconcile"),
        }
    }
}
