// ==========================================
// 注入数据稳定性核对 - Presto (Hive) 分区引擎连接
// ==========================================
// 流程: 打开(探测协调节点) -> 发现分区表 -> 每个 (表 × 产品类型) 一次查询
// 查询: 产品类型精确匹配 + 固定站点 + identifiers 包含 IP 前缀
// 红线: 同一产品类型的计数在所有表上求和后返回
// ==========================================

pub mod client;
pub mod discovery;

use crate::config::PartitionedCredentials;
use crate::connector::error::SourceResult;
use crate::connector::{log_query, log_result, non_negative, SourceConnection, SourceConnector};
use crate::domain::{ProductType, QueryWindow, SourceKind, TableHandle};
use std::time::Instant;

pub use client::{PrestoClient, PrestoStatement, PrestoValue};
pub use discovery::{discover_tables, TableCatalog};

/// 单表计数查询（表名为已发现的引用标识符,其余值参数绑定）
pub fn count_statement(
    table: &TableHandle,
    product_type: ProductType,
    window: &QueryWindow,
) -> PrestoStatement {
    let sql = format!(
        "SELECT count(DISTINCT product_id) AS amount FROM {} \
         WHERE product_type = ? AND site_id = 1 AND identifiers LIKE ?",
        table.quoted()
    );
    PrestoStatement::new(sql)
        .bind(PrestoValue::Integer(product_type.code()))
        .bind(PrestoValue::Varchar(format!("%{}%", window.ip_prefix())))
}

// ==========================================
// PartitionedConnector
// ==========================================
pub struct PartitionedConnector {
    credentials: PartitionedCredentials,
}

impl PartitionedConnector {
    pub fn new(credentials: PartitionedCredentials) -> Self {
        Self { credentials }
    }
}

impl SourceConnector for PartitionedConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::PartitionedEngine
    }

    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>> {
        let client = PrestoClient::from_credentials(&self.credentials)?;
        tracing::debug!(
            coordinator = %client.base_url(),
            catalog = %self.credentials.catalog,
            schema = %self.credentials.schema,
            "连接 Presto"
        );
        client.ping()?;

        Ok(Box::new(PartitionedConnection::new(client)))
    }
}

// ==========================================
// PartitionedConnection
// ==========================================
pub struct PartitionedConnection {
    client: PrestoClient,
    tables: Vec<TableHandle>,
}

impl PartitionedConnection {
    pub fn new(client: PrestoClient) -> Self {
        Self {
            client,
            tables: Vec::new(),
        }
    }

    /// 本次运行已发现的物理表
    pub fn tables(&self) -> &[TableHandle] {
        &self.tables
    }
}

impl SourceConnection for PartitionedConnection {
    fn prepare(&mut self, window: &QueryWindow) -> SourceResult<()> {
        self.tables = discover_tables(&mut self.client, window)?;
        Ok(())
    }

    fn execute_count(
        &mut self,
        product_type: ProductType,
        window: &QueryWindow,
    ) -> SourceResult<u64> {
        let mut amount = 0u64;

        for table in &self.tables {
            let statement = count_statement(table, product_type, window);
            log_query(SourceKind::PartitionedEngine, statement.sql(), &statement.params());

            let started = Instant::now();
            let value = self.client.query_count(&statement)?;
            let table_amount = non_negative(SourceKind::PartitionedEngine, value)?;

            log_result(
                SourceKind::PartitionedEngine,
                statement.sql(),
                product_type,
                Some(table.name()),
                table_amount,
                started.elapsed(),
            );
            amount += table_amount;
        }

        Ok(amount)
    }
}

impl Drop for PartitionedConnection {
    fn drop(&mut self) {
        tracing::debug!(source = %SourceKind::PartitionedEngine, "关闭连接");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_count_statement_quotes_table_and_binds_values() {
        let window = QueryWindow::new(
            NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            "10.1",
        );
        let stmt = count_statement(
            &TableHandle::new("xdr_2024_01_01"),
            ProductType::new(5),
            &window,
        );

        assert!(stmt.sql().contains("FROM \"xdr_2024_01_01\""));
        assert!(stmt.sql().contains("site_id = 1"));
        assert!(!stmt.sql().contains("10.1"));
        assert_eq!(
            stmt.params(),
            &[
                PrestoValue::Integer(5),
                PrestoValue::Varchar("%10.1%".to_string())
            ]
        );
    }

    #[test]
    fn test_no_tables_counts_zero_without_queries() {
        let client = PrestoClient::new("http://127.0.0.1:1", "u", "hive", "default").unwrap();
        let mut connection = PartitionedConnection::new(client);
        let window = QueryWindow::new(
            NaiveDateTime::parse_from_str("2024-01-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            "10.1",
        );
        assert!(connection.tables().is_empty());
        assert_eq!(connection.execute_count(ProductType::new(1), &window).unwrap(), 0);
    }
}
