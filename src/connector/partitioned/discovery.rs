// ==========================================
// 注入数据稳定性核对 - 分区表发现
// ==========================================
// 职责: 在 [start, start+1天) 内逐日查询目录,找出按日期命名的物理表
// 命名约定: 含主题标记 xdr,不含 index,含日期标记 YYYY_MM_DD
// 红线: 结果按日期顺序拼接,不去重;未找到表是预期结果,不是错误
// ==========================================

use crate::connector::error::SourceResult;
use crate::connector::partitioned::client::{PrestoClient, PrestoStatement, PrestoValue};
use crate::domain::{QueryWindow, TableHandle};
use chrono::NaiveDate;
use serde_json::Value;

/// 主题标记
pub const TOPIC_TOKEN: &str = "xdr";

/// 排除标记
pub const EXCLUDED_TOKEN: &str = "index";

/// 日期标记格式
pub const DATE_TOKEN_FORMAT: &str = "%Y_%m_%d";

/// 目录查询
pub const DISCOVERY_SQL: &str = "SELECT table_name FROM information_schema.tables \
     WHERE table_name LIKE ? AND table_name NOT LIKE ? AND table_name LIKE ?";

// ==========================================
// TableCatalog Trait
// ==========================================
// 用途: 按日列出候选表名
// 实现者: PrestoClient（information_schema.tables）
pub trait TableCatalog {
    fn list_tables(&mut self, day: NaiveDate) -> SourceResult<Vec<TableHandle>>;
}

/// 某日的日期标记
pub fn date_token(day: NaiveDate) -> String {
    day.format(DATE_TOKEN_FORMAT).to_string()
}

/// 某日的目录查询语句
pub fn discovery_statement(day: NaiveDate) -> PrestoStatement {
    PrestoStatement::new(DISCOVERY_SQL)
        .bind(PrestoValue::Varchar(format!("%{}%", TOPIC_TOKEN)))
        .bind(PrestoValue::Varchar(format!("%{}%", EXCLUDED_TOKEN)))
        .bind(PrestoValue::Varchar(format!("%{}%", date_token(day))))
}

impl TableCatalog for PrestoClient {
    fn list_tables(&mut self, day: NaiveDate) -> SourceResult<Vec<TableHandle>> {
        let statement = discovery_statement(day);
        tracing::debug!(query = %statement, params = ?statement.params(), "查询分区表目录");

        let rows = self.query(&statement)?;
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(Value::String(name)) if !name.is_empty() => Some(TableHandle::new(name)),
                _ => None,
            })
            .collect())
    }
}

/// 发现查询窗口内的全部物理表
///
/// # 返回
/// - 逐日结果按顺序拼接（可能重复）
/// - 未找到任何表: 记录警告并返回空列表
pub fn discover_tables(
    catalog: &mut dyn TableCatalog,
    window: &QueryWindow,
) -> SourceResult<Vec<TableHandle>> {
    let mut tables = Vec::new();
    for day in window.discovery_days() {
        let found = catalog.list_tables(day)?;
        tracing::debug!(day = %date_token(day), found = found.len(), "分区表发现");
        tables.extend(found);
    }

    if tables.is_empty() {
        tracing::warn!(
            start = %window.start_time(),
            end = %window.discovery_end(),
            "Presto (Hive) 在给定日期范围内未找到分区表"
        );
    } else {
        tracing::info!(
            tables = ?tables.iter().map(TableHandle::name).collect::<Vec<_>>(),
            "发现分区表 {} 张",
            tables.len()
        );
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::error::SourceError;
    use chrono::NaiveDateTime;

    struct FakeCatalog {
        tables: Vec<(NaiveDate, Vec<&'static str>)>,
        requested: Vec<NaiveDate>,
        fail: bool,
    }

    impl TableCatalog for FakeCatalog {
        fn list_tables(&mut self, day: NaiveDate) -> SourceResult<Vec<TableHandle>> {
            self.requested.push(day);
            if self.fail {
                return Err(SourceError::Query("catalog unavailable".to_string()));
            }
            Ok(self
                .tables
                .iter()
                .filter(|(d, _)| *d == day)
                .flat_map(|(_, names)| names.iter().map(|n| TableHandle::new(*n)))
                .collect())
        }
    }

    fn window(start: &str) -> QueryWindow {
        QueryWindow::new(
            NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M:%S").unwrap(),
            "10.1",
        )
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_token_format() {
        assert_eq!(date_token(day(2024, 3, 7)), "2024_03_07");
    }

    #[test]
    fn test_discovery_statement_binds_patterns() {
        let stmt = discovery_statement(day(2024, 1, 1));
        assert_eq!(
            stmt.params(),
            &[
                PrestoValue::Varchar("%xdr%".to_string()),
                PrestoValue::Varchar("%index%".to_string()),
                PrestoValue::Varchar("%2024_01_01%".to_string()),
            ]
        );
        assert!(!stmt.sql().contains("2024"));
    }

    #[test]
    fn test_discover_queries_start_day_once() {
        let mut catalog = FakeCatalog {
            tables: vec![(day(2024, 1, 1), vec!["xdr_2024_01_01", "xdr_b_2024_01_01"])],
            requested: Vec::new(),
            fail: false,
        };
        let tables = discover_tables(&mut catalog, &window("2024-01-01 12:00:00")).unwrap();

        assert_eq!(catalog.requested, vec![day(2024, 1, 1)]);
        assert_eq!(
            tables,
            vec![
                TableHandle::new("xdr_2024_01_01"),
                TableHandle::new("xdr_b_2024_01_01")
            ]
        );
    }

    #[test]
    fn test_discover_empty_is_not_error() {
        let mut catalog = FakeCatalog {
            tables: Vec::new(),
            requested: Vec::new(),
            fail: false,
        };
        let tables = discover_tables(&mut catalog, &window("2024-01-01 00:00:00")).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_discover_propagates_catalog_failure() {
        let mut catalog = FakeCatalog {
            tables: Vec::new(),
            requested: Vec::new(),
            fail: true,
        };
        let err = discover_tables(&mut catalog, &window("2024-01-01 00:00:00")).unwrap_err();
        assert!(matches!(err, SourceError::Query(_)));
    }
}
