// ==========================================
// 注入数据稳定性核对 - 数据源错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 错误只在数据源边界被捕获,不会中断其他数据源
// ==========================================

use thiserror::Error;

/// 数据源错误类型
#[derive(Error, Debug)]
pub enum SourceError {
    // ===== 连接错误 =====
    #[error("数据库连接失败: {0}")]
    Connection(String),

    // ===== 查询错误 =====
    #[error("数据库查询失败: {0}")]
    Query(String),

    #[error("响应格式错误: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn is_connection(&self) -> bool {
        matches!(self, SourceError::Connection(_))
    }
}

// 实现 From<reqwest::Error>
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            SourceError::Connection(err.to_string())
        } else if err.is_decode() {
            SourceError::Protocol(err.to_string())
        } else {
            SourceError::Query(err.to_string())
        }
    }
}

/// Result 类型别名
pub type SourceResult<T> = Result<T, SourceError>;
