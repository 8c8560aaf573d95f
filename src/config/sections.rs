// ==========================================
// 注入数据稳定性核对 - 配置节类型
// ==========================================
// 职责: 把 ConfigView 中的键值转换为强类型凭据与业务参数
// 红线: Debug 输出不得包含密码
// ==========================================

use crate::config::config_view::ConfigView;
use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::{QueryWindow, SourceKind};
use chrono::{Duration, NaiveDateTime};
use std::fmt;

/// 数仓/ASE 查询下界相对注入时间的回看分钟数（3 小时 20 分）
pub const DEFAULT_LOOKBACK_MINUTES: i64 = 200;

/// 注入时间格式
pub const INJECTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DEFAULT_ODBC_DRIVER: &str = "FreeTDS";

// ==========================================
// InjectionParams - 注入业务参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionParams {
    pub start_ip: String,
    pub injection_start_time: NaiveDateTime,
    pub lookback_minutes: i64,
    query_start_time: NaiveDateTime,
}

impl InjectionParams {
    /// 读取 [injection] 节（缺失即为致命配置错误）
    pub fn from_config(config: &ConfigView) -> ConfigResult<Self> {
        let start_ip = config.require("injection", "start_ip")?.to_string();

        let raw_time = config.require("injection", "injection_start_time")?;
        let injection_start_time = NaiveDateTime::parse_from_str(raw_time, INJECTION_TIME_FORMAT)
            .map_err(|e| ConfigError::InvalidValue {
                section: "injection".to_string(),
                key: "injection_start_time".to_string(),
                value: raw_time.to_string(),
                message: format!("期望格式 YYYY-MM-DD HH:MM:SS ({})", e),
            })?;

        let lookback_minutes = match config.get("injection", "lookback_minutes") {
            Some(_) => config.require_parsed::<i64>("injection", "lookback_minutes")?,
            None => DEFAULT_LOOKBACK_MINUTES,
        };

        // 回看分钟数超出时间可表示范围时拒绝,而不是在计算下界时溢出
        let query_start_time = Duration::try_minutes(lookback_minutes)
            .and_then(|lookback| injection_start_time.checked_sub_signed(lookback))
            .ok_or_else(|| ConfigError::InvalidValue {
                section: "injection".to_string(),
                key: "lookback_minutes".to_string(),
                value: lookback_minutes.to_string(),
                message: "回看时长超出可表示的时间范围".to_string(),
            })?;

        Ok(Self {
            start_ip,
            injection_start_time,
            lookback_minutes,
            query_start_time,
        })
    }

    /// 数仓/ASE 的查询下界: injection_start_time - lookback
    pub fn query_start_time(&self) -> NaiveDateTime {
        self.query_start_time
    }

    /// 为指定数据源构造查询窗口
    pub fn window_for(&self, kind: SourceKind) -> QueryWindow {
        let start = if kind.uses_lookback() {
            self.query_start_time()
        } else {
            self.injection_start_time
        };
        QueryWindow::new(start, self.start_ip.clone())
    }
}

// ==========================================
// WarehouseCredentials - [gpdb]
// ==========================================
#[derive(Clone)]
pub struct WarehouseCredentials {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl WarehouseCredentials {
    pub fn from_config(config: &ConfigView) -> ConfigResult<Self> {
        Ok(Self {
            user: config.require("gpdb", "gpdb_user_name")?.to_string(),
            password: config.require("gpdb", "gpdb_pass")?.to_string(),
            host: config.require("gpdb", "gpdb_host")?.to_string(),
            port: config.require_parsed("gpdb", "gpdb_port")?,
            database: config.require("gpdb", "gpdb_database")?.to_string(),
        })
    }
}

impl fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

// ==========================================
// PartitionedCredentials - [presto]
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionedCredentials {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub catalog: String,
    pub schema: String,
    pub scheme: String,
}

impl PartitionedCredentials {
    pub fn from_config(config: &ConfigView) -> ConfigResult<Self> {
        let scheme = config.get("presto", "presto_scheme").unwrap_or("http");
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidValue {
                section: "presto".to_string(),
                key: "presto_scheme".to_string(),
                value: scheme.to_string(),
                message: "仅支持 http / https".to_string(),
            });
        }

        Ok(Self {
            user: config.require("presto", "presto_user_name")?.to_string(),
            host: config.require("presto", "presto_host")?.to_string(),
            port: config.require_parsed("presto", "presto_port")?,
            catalog: config.require("presto", "presto_catalog")?.to_string(),
            schema: config.require("presto", "presto_schema")?.to_string(),
            scheme: scheme.to_string(),
        })
    }

    /// 协调节点基础地址
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

// ==========================================
// LegacyCredentials - [ase]
// ==========================================
/// ODBC 连接目标: 已配置的 DSN,或 驱动 + 主机端口
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyTarget {
    Dsn(String),
    Server {
        driver: String,
        host: String,
        port: u16,
    },
}

#[derive(Clone)]
pub struct LegacyCredentials {
    pub user: String,
    pub password: String,
    pub target: LegacyTarget,
}

impl LegacyCredentials {
    pub fn from_config(config: &ConfigView) -> ConfigResult<Self> {
        let target = match config.get("ase", "ase_dsn") {
            Some(dsn) if !dsn.is_empty() => LegacyTarget::Dsn(dsn.to_string()),
            _ => LegacyTarget::Server {
                driver: config
                    .get("ase", "ase_driver")
                    .unwrap_or(DEFAULT_ODBC_DRIVER)
                    .to_string(),
                host: config.require("ase", "ase_host")?.to_string(),
                port: config.require_parsed("ase", "ase_port")?,
            },
        };

        Ok(Self {
            user: config.require("ase", "ase_user_name")?.to_string(),
            password: config.require("ase", "ase_pass")?.to_string(),
            target,
        })
    }

    /// ODBC 连接串
    pub fn connection_string(&self) -> String {
        let location = match &self.target {
            LegacyTarget::Dsn(dsn) => format!("DSN={};", dsn),
            LegacyTarget::Server { driver, host, port } => {
                format!("DRIVER={{{}}};SERVER={},{};", driver, host, port)
            }
        };
        format!(
            "{}UID={};PWD={}",
            location,
            odbc_value(&self.user),
            odbc_value(&self.password)
        )
    }
}

impl fmt::Debug for LegacyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LegacyCredentials")
            .field("user", &self.user)
            .field("password", &"***")
            .field("target", &self.target)
            .finish()
    }
}

/// 含分号/花括号的值需要用 {} 包裹,内部 } 双写
fn odbc_value(value: &str) -> String {
    let needs_braces = value.contains(|c| matches!(c, ';' | '{' | '}'))
        || value.starts_with(' ')
        || value.ends_with(' ');
    if needs_braces {
        format!("{{{}}}", value.replace('}', "}}"))
    } else {
        value.to_string()
    }
}
