// ==========================================
// 注入数据稳定性核对 - Sybase ASE 连接
// ==========================================
// 驱动: odbc-api（需启用 odbc 特性并安装 unixODBC + FreeTDS）
// 查询: 参与方关联产品,参与方标识前缀匹配 + 产品类型 + 开始时间下界
// ==========================================

use crate::config::LegacyCredentials;
use crate::connector::error::SourceResult;
use crate::connector::{SourceConnection, SourceConnector};
use crate::domain::SourceKind;

/// ASE 计数查询
///
/// 参数: ? 参与方标识前缀模式, ? 产品类型, ? 开始时间下界
pub const LEGACY_COUNT_SQL: &str = "SELECT COUNT(DISTINCT pp.product_id) AS amount \
     FROM products.dbo.PRODUCT_PARTICIPANTS pp \
     JOIN products.dbo.PRODUCTS p ON pp.product_id = p.product_id \
     WHERE pp.participant_identifier LIKE ? \
     AND p.product_type = ? \
     AND p.product_start_time > ?";

/// 参与方标识前缀匹配模式
pub fn participant_pattern(prefix: &str) -> String {
    format!("{}%", prefix)
}

// ==========================================
// LegacyConnector
// ==========================================
pub struct LegacyConnector {
    credentials: LegacyCredentials,
}

impl LegacyConnector {
    pub fn new(credentials: LegacyCredentials) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &LegacyCredentials {
        &self.credentials
    }
}

impl SourceConnector for LegacyConnector {
    fn kind(&self) -> SourceKind {
        SourceKind::LegacyRdbms
    }

    #[cfg(feature = "odbc")]
    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>> {
        tracing::debug!(target_db = ?self.credentials.target, "连接 ASE");
        let connection = odbc::connect(&self.credentials.connection_string())?;
        Ok(Box::new(odbc::LegacyConnection::new(connection)))
    }

    #[cfg(not(feature = "odbc"))]
    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>> {
        Err(crate::connector::SourceError::Connection(
            "未启用 odbc 特性,无法连接 ASE（使用 --features odbc 重新构建）".to_string(),
        ))
    }
}

#[cfg(feature = "odbc")]
mod odbc {
    use super::{participant_pattern, LEGACY_COUNT_SQL};
    use crate::connector::error::{SourceError, SourceResult};
    use crate::connector::{log_query, log_result, non_negative, SourceConnection};
    use crate::domain::{ProductType, QueryWindow, SourceKind};
    use chrono::{Datelike, NaiveDateTime, Timelike};
    use odbc_api::sys::Timestamp;
    use odbc_api::{Connection, ConnectionOptions, Cursor, Environment, IntoParameter, Nullable};
    use std::sync::OnceLock;
    use std::time::Instant;

    static ODBC_ENV: OnceLock<Environment> = OnceLock::new();

    /// 进程级 ODBC 环境（首次使用时创建）
    fn environment() -> SourceResult<&'static Environment> {
        if let Some(env) = ODBC_ENV.get() {
            return Ok(env);
        }
        let env = Environment::new().map_err(|e| SourceError::Connection(e.to_string()))?;
        Ok(ODBC_ENV.get_or_init(|| env))
    }

    pub(super) fn connect(connection_string: &str) -> SourceResult<Connection<'static>> {
        environment()?
            .connect_with_connection_string(connection_string, ConnectionOptions::default())
            .map_err(|e| SourceError::Connection(e.to_string()))
    }

    fn to_odbc_timestamp(value: NaiveDateTime) -> Timestamp {
        Timestamp {
            year: value.year() as i16,
            month: value.month() as u16,
            day: value.day() as u16,
            hour: value.hour() as u16,
            minute: value.minute() as u16,
            second: value.second() as u16,
            fraction: 0,
        }
    }

    pub(super) struct LegacyConnection {
        connection: Connection<'static>,
    }

    impl LegacyConnection {
        pub(super) fn new(connection: Connection<'static>) -> Self {
            Self { connection }
        }
    }

    impl SourceConnection for LegacyConnection {
        fn execute_count(
            &mut self,
            product_type: ProductType,
            window: &QueryWindow,
        ) -> SourceResult<u64> {
            let pattern = participant_pattern(window.ip_prefix());
            let code = product_type.code();
            let start_time = to_odbc_timestamp(window.start_time());

            log_query(
                SourceKind::LegacyRdbms,
                LEGACY_COUNT_SQL,
                &(&pattern, code, window.start_time()),
            );

            let started = Instant::now();
            let pattern_param = pattern.as_str().into_parameter();
            let cursor = self
                .connection
                .execute(LEGACY_COUNT_SQL, (&pattern_param, &code, &start_time))
                .map_err(|e| SourceError::Query(e.to_string()))?;

            let value = match cursor {
                Some(mut cursor) => match cursor
                    .next_row()
                    .map_err(|e| SourceError::Query(e.to_string()))?
                {
                    Some(mut row) => {
                        let mut amount = Nullable::<i64>::null();
                        row.get_data(1, &mut amount)
                            .map_err(|e| SourceError::Protocol(e.to_string()))?;
                        amount.into_opt().unwrap_or(0)
                    }
                    None => 0,
                },
                None => 0,
            };
            let amount = non_negative(SourceKind::LegacyRdbms, value)?;

            log_result(
                SourceKind::LegacyRdbms,
                LEGACY_COUNT_SQL,
                product_type,
                None,
                amount,
                started.elapsed(),
            );
            Ok(amount)
        }
    }

    impl Drop for LegacyConnection {
        fn drop(&mut self) {
            tracing::debug!(source = %SourceKind::LegacyRdbms, "关闭连接");
        }
    }
}
