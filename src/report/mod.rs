// ==========================================
// 注入数据稳定性核对 - 报表输出层
// ==========================================
// 职责: 接收合并结果与产品类型顺序,持久化为两列表格
// ==========================================

pub mod csv_report;
pub mod error;

pub use csv_report::{CsvReportWriter, ReportSink, DEFAULT_REPORT_FILE, REPORT_HEADER};
pub use error::{ReportError, ReportResult};
