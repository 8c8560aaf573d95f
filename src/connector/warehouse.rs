// ==========================================
// 注入数据稳定性核对 - Greenplum 数仓连接
// ==========================================
// 驱动: postgres (同步客户端)
// 查询: 产品类型精确匹配 + IP 文本前缀匹配 + 开始时间下界 + 固定站点
// ==========================================

use crate::config::WarehouseCredentials;
use crate::connector::error::{SourceError, SourceResult};
use crate::connector::{log_query, log_result, non_negative, SourceConnection, SourceConnector};
use crate::domain::{ProductType, QueryWindow, SourceKind};
use postgres::{Client, NoTls, Statement};
use std::time::Instant;

/// 数仓计数查询
///
/// 参数: $1 IP 前缀模式, $2 开始时间下界, $3 产品类型
pub const WAREHOUSE_COUNT_SQL: &str = "SELECT count(DISTINCT product_id) AS amount \
     FROM merit.dbo.product_participants \
     WHERE ip_address::text LIKE $1::text \
     AND product_start_time > $2::timestamp \
     AND site_number = 1 \
     AND product_type = $3::bigint";

/// IP 前缀匹配模式
pub fn ip_prefix_pattern(prefix: &str) -> String {
    format!("{}%", prefix)
}

// ==========================================
// WarehouseConnector
// ==========================================
pub struct WarehouseConnector {
    credentials: WarehouseCredentials,
}

impl WarehouseConnector {
    pub fn new(credentials: WarehouseCredentials) -> Self {
        Self { credentials }
    }

    fn pg_config(&self) -> postgres::Config {
        let c = &self.credentials;
        let mut config = postgres::Config::new();
        config
            .user(&c.user)
            .password(&c.password)
            .host(&c.host)
            .port(c.port)
            .dbname(&c.database)
            .application_name("injection-audit");
        config
    }
}

impl SourceConnector for WarehouseConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::Warehouse
    }

    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>> {
        tracing::debug!(
            host = %self.credentials.host,
            port = self.credentials.port,
            database = %self.credentials.database,
            "连接 GPDB"
        );
        let client = self
            .pg_config()
            .connect(NoTls)
            .map_err(|e| SourceError::Connection(e.to_string()))?;

        Ok(Box::new(WarehouseConnection {
            client,
            statement: None,
        }))
    }
}

// ==========================================
// WarehouseConnection
// ==========================================
struct WarehouseConnection {
    client: Client,
    statement: Option<Statement>,
}

impl WarehouseConnection {
    fn statement(&mut self) -> SourceResult<Statement> {
        if let Some(statement) = &self.statement {
            return Ok(statement.clone());
        }
        let statement = self
            .client
            .prepare(WAREHOUSE_COUNT_SQL)
            .map_err(|e| SourceError::Query(e.to_string()))?;
        self.statement = Some(statement.clone());
        Ok(statement)
    }
}

impl SourceConnection for WarehouseConnection {
    fn prepare(&mut self, _window: &QueryWindow) -> SourceResult<()> {
        self.statement().map(|_| ())
    }

    fn execute_count(
        &mut self,
        product_type: ProductType,
        window: &QueryWindow,
    ) -> SourceResult<u64> {
        let statement = self.statement()?;
        let pattern = ip_prefix_pattern(window.ip_prefix());
        let start_time = window.start_time();
        let code = product_type.code();

        log_query(
            SourceKind::Warehouse,
            WAREHOUSE_COUNT_SQL,
            &(&pattern, start_time, code),
        );

        let started = Instant::now();
        let row = self
            .client
            .query_opt(&statement, &[&pattern, &start_time, &code])
            .map_err(|e| SourceError::Query(e.to_string()))?;

        let amount = match row {
            Some(row) => {
                let value: Option<i64> = row
                    .try_get(0)
                    .map_err(|e| SourceError::Protocol(e.to_string()))?;
                non_negative(SourceKind::Warehouse, value.unwrap_or(0))?
            }
            None => 0,
        };

        log_result(
            SourceKind::Warehouse,
            WAREHOUSE_COUNT_SQL,
            product_type,
            None,
            amount,
            started.elapsed(),
        );
        Ok(amount)
    }
}

impl Drop for WarehouseConnection {
    fn drop(&mut self) {
        tracing::debug!(source = %SourceKind::Warehouse, "关闭连接");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_sql_uses_bound_parameters() {
        assert!(WAREHOUSE_COUNT_SQL.contains("LIKE $1::text"));
        assert!(WAREHOUSE_COUNT_SQL.contains("product_start_time > $2::timestamp"));
        assert!(WAREHOUSE_COUNT_SQL.contains("product_type = $3::bigint"));
        assert!(WAREHOUSE_COUNT_SQL.contains("site_number = 1"));
        assert!(!WAREHOUSE_COUNT_SQL.contains('\''));
    }

    #[test]
    fn test_ip_prefix_pattern() {
        assert_eq!(ip_prefix_pattern("10.1"), "10.1%");
    }

    #[test]
    fn test_open_unreachable_is_connection_error() {
        let connector = WarehouseConnector::new(WarehouseCredentials {
            user: "audit".to_string(),
            password: "audit".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "merit".to_string(),
        });
        match connector.open() {
            Err(err) => assert!(err.is_connection()),
            Ok(_) => panic!("port 1 should refuse connections"),
        };
    }
}
