// ==========================================
// 注入数据稳定性核对 - 核心库
// ==========================================
// 技术栈: Rust + Greenplum (postgres) + Presto (HTTP) + Sybase ASE (ODBC)
// 系统定位: 批处理核对任务,单次运行,顺序执行
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 产品类型、计数映射、查询窗口
pub mod domain;

// 配置层 - config.ini 只读视图
pub mod config;

// 数据源连接层 - 三种存储的计数查询
pub mod connector;

// 引擎层 - 单数据源聚合与跨数据源合并
pub mod engine;

// 报表输出层
pub mod report;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigError, ConfigView, InjectionParams};
pub use connector::{SourceConnection, SourceConnector, SourceError};
pub use domain::{CountMap, MergedCounts, ProductType, QueryWindow, SourceKind, TableHandle};
pub use engine::{
    merge_counts, ActiveSource, CountAggregator, ReconciliationEngine, ReconciliationReport,
    SourceOutcome, SourceStatus,
};
pub use report::{CsvReportWriter, ReportError, ReportSink};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "注入数据稳定性核对";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
