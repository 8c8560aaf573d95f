// ==========================================
// 注入数据稳定性核对 - 引擎层
// ==========================================
// 职责: 驱动各数据源计数,按产品类型合并
// 红线: 引擎不拼 SQL,数据源失败在数据源边界隔离
// ==========================================

pub mod aggregator;
pub mod reconciliation;

// 重导出核心引擎
pub use aggregator::{CountAggregator, SourceOutcome, SourceStatus};
pub use reconciliation::{merge_counts, ActiveSource, ReconciliationEngine, ReconciliationReport};
