// ==========================================
// 注入数据稳定性核对 - 报表错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 报表输出错误类型
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("报表文件写入失败: {0}")]
    Io(String),

    #[error("CSV 写入失败: {0}")]
    Csv(String),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Io(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        ReportError::Csv(err.to_string())
    }
}

/// Result 类型别名
pub type ReportResult<T> = Result<T, ReportError>;
