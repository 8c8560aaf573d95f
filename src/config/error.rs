// ==========================================
// 注入数据稳定性核对 - 配置错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    // ===== 文件相关错误 =====
    #[error("配置文件不存在: {0}")]
    NotFound(String),

    #[error("配置文件解析失败: {0}")]
    Parse(String),

    #[error("配置文件中没有任何节: {0}")]
    NoSections(String),

    // ===== 键值错误 =====
    #[error("缺少配置节: [{0}]")]
    MissingSection(String),

    #[error("缺少配置项: [{section}] {key}")]
    MissingKey { section: String, key: String },

    #[error("配置值格式错误 ([{section}] {key} = {value}): {message}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        message: String,
    },
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
