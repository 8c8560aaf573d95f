// ==========================================
// 注入数据稳定性核对 - 配置层
// ==========================================
// 职责: config.ini 只读视图,连接凭据与业务参数
// 红线: 只读,运行期间不修改
// ==========================================

pub mod config_view;
pub mod error;
pub mod sections;

// 重导出
pub use config_view::{resolve_config_path, ConfigView, DEFAULT_CONFIG_FILE};
pub use error::{ConfigError, ConfigResult};
pub use sections::{
    InjectionParams, LegacyCredentials, LegacyTarget, PartitionedCredentials,
    WarehouseCredentials, DEFAULT_LOOKBACK_MINUTES,
};
