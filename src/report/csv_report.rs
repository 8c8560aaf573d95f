// ==========================================
// 注入数据稳定性核对 - CSV 报表
// ==========================================
// 格式: 表头 "Product Type,Total Received",每个并集产品类型一行
// 顺序: 调用方给定的产品类型顺序
// ==========================================

use crate::domain::{MergedCounts, ProductType};
use crate::report::error::ReportResult;
use csv::{Terminator, WriterBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 默认报表文件名（当前工作目录）
pub const DEFAULT_REPORT_FILE: &str = "Stability_results.csv";

/// 报表表头
pub const REPORT_HEADER: [&str; 2] = ["Product Type", "Total Received"];

// ==========================================
// ReportSink Trait
// ==========================================
pub trait ReportSink {
    fn write_report(&self, product_types: &[ProductType], merged: &MergedCounts)
        -> ReportResult<()>;
}

// ==========================================
// CsvReportWriter
// ==========================================
pub struct CsvReportWriter {
    path: PathBuf,
}

impl CsvReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 写入任意 Writer（文件写入与测试共用）
    pub fn write_to<W: Write>(
        writer: W,
        product_types: &[ProductType],
        merged: &MergedCounts,
    ) -> ReportResult<()> {
        let mut csv_writer = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(writer);

        csv_writer.write_record(REPORT_HEADER)?;
        for product_type in product_types {
            csv_writer.write_record([
                product_type.to_string(),
                merged.get(*product_type).to_string(),
            ])?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

impl ReportSink for CsvReportWriter {
    fn write_report(
        &self,
        product_types: &[ProductType],
        merged: &MergedCounts,
    ) -> ReportResult<()> {
        let file = std::fs::File::create(&self.path)?;
        Self::write_to(file, product_types, merged)?;
        tracing::debug!(path = %self.path.display(), rows = product_types.len(), "报表已写入");
        Ok(())
    }
}
