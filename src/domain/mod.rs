// ==========================================
// 注入数据稳定性核对 - 领域模型层
// ==========================================
// 职责: 定义产品类型、数据源、计数映射、查询窗口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod counts;
pub mod types;
pub mod window;

// 重导出核心类型
pub use counts::{union_product_types, CountMap, MergedCounts};
pub use types::{ProductType, SourceKind};
pub use window::{QueryWindow, TableHandle};
