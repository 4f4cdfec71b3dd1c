// ==========================================
// 药房配送协同系统 - 分桶锁
// ==========================================
// 职责: 按 (承运商, 日期) 串行化 “计数 → 判定 → 写回”
// 说明: 仅在进程内生效; 跨进程一致性依赖 reconcile_bucket 的幂等重跑
// ==========================================

use crate::domain::types::CarrierName;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

type LockKey = (CarrierName, NaiveDate);

/// 单个 (承运商, 日期) 的锁句柄
#[derive(Debug, Clone)]
pub struct BucketLockHandle {
    inner: Arc<Mutex<()>>,
}

impl BucketLockHandle {
    /// 获取锁
    ///
    /// 锁内无数据,中毒后直接继续使用
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ==========================================
// BucketLocks - 分桶锁注册表
// ==========================================
#[derive(Debug, Default)]
pub struct BucketLocks {
    locks: Mutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl BucketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取 (承运商, 日期) 对应的锁句柄（不存在则创建）
    pub fn handle(&self, carrier: CarrierName, date: NaiveDate) -> BucketLockHandle {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        let inner = locks
            .entry((carrier, date))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        BucketLockHandle { inner }
    }

    /// 持锁执行 f; 结束后若无其他持有者则移除该键
    pub fn with_lock<T>(&self, carrier: CarrierName, date: NaiveDate, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(carrier, date);
        let result = {
            let _guard = handle.acquire();
            f()
        };
        drop(handle);
        self.release((carrier, date));
        result
    }

    /// 注册表自身是唯一持有者时移除该键
    fn release(&self, key: LockKey) {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        if locks
            .get(&key)
            .map_or(false, |lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&key);
        }
    }

    /// 清理无人持有的锁
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
