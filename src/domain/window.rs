// ==========================================
// 注入数据稳定性核对 - 查询窗口
// ==========================================
// 职责: 查询时间下界 + IP 前缀（一次核对运行内不可变）
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// 分区引擎的表发现窗口长度（天）
pub const DISCOVERY_WINDOW_DAYS: i64 = 1;

// ==========================================
// QueryWindow - 查询窗口
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryWindow {
    start_time: NaiveDateTime,
    ip_prefix: String,
}

impl QueryWindow {
    pub fn new(start_time: NaiveDateTime, ip_prefix: impl Into<String>) -> Self {
        Self {
            start_time,
            ip_prefix: ip_prefix.into(),
        }
    }

    /// 时间下界（严格大于）
    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn ip_prefix(&self) -> &str {
        &self.ip_prefix
    }

    /// 分区引擎的隐式上界: start + 1 天
    pub fn discovery_end(&self) -> NaiveDateTime {
        self.start_time
            .checked_add_signed(Duration::days(DISCOVERY_WINDOW_DAYS))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// [start, start+1天) 内逐日迭代的日期（至少一天）
    pub fn discovery_days(&self) -> Vec<NaiveDate> {
        let end = self.discovery_end();
        let mut days = Vec::new();
        let mut cursor = self.start_time;
        while cursor < end {
            days.push(cursor.date());
            match cursor.checked_add_signed(Duration::days(1)) {
                Some(next) => cursor = next,
                None => break,
            }
        }
        days
    }
}

// ==========================================
// TableHandle - 已发现的物理表名
// ==========================================
// 生命周期仅限单次运行,不持久化
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableHandle(String);

impl TableHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// 双引号标识符（表名无法参数绑定）
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0.replace('"', "\"\""))
    }
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
