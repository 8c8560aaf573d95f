// ==========================================
// 注入数据稳定性核对 - 单数据源计数聚合
// ==========================================
// 职责: 用一个连接依次查询全部产品类型,产出 CountMap
// 红线: 失败隔离在数据源之间;某产品类型失败后,其余未执行的类型保持 0
// 红线: 连接在任何退出路径上都被释放（作用域结束即 Drop）
// ==========================================

use crate::connector::{SourceConnector, SourceResult};
use crate::domain::{CountMap, ProductType, QueryWindow, SourceKind};
use crate::perf::PerfGuard;
use serde::Serialize;
use tracing::{error, info, info_span};

// ==========================================
// SourceStatus / SourceOutcome
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    Completed,
    Failed { error: String },
}

#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source: SourceKind,
    pub counts: CountMap,
    pub status: SourceStatus,
    /// 成功完成查询的产品类型数
    pub product_types_completed: usize,
}

impl SourceOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, SourceStatus::Failed { .. })
    }
}

// ==========================================
// CountAggregator
// ==========================================
pub struct CountAggregator<'a> {
    connector: &'a dyn SourceConnector,
}

impl<'a> CountAggregator<'a> {
    pub fn new(connector: &'a dyn SourceConnector) -> Self {
        Self { connector }
    }

    /// 对一个数据源执行全部产品类型的计数
    ///
    /// # 返回
    /// - 每个输入产品类型恰有一项（失败时为已完成部分 + 其余 0）
    ///
    /// 本方法不返回错误: 连接/查询失败记录日志后体现在 SourceStatus 中
    pub fn run(&self, product_types: &[ProductType], window: &QueryWindow) -> SourceOutcome {
        let kind = self.connector.kind();
        let span = info_span!("source", source = %kind);
        let _enter = span.enter();
        let _perf = PerfGuard::new("source_count");

        let mut counts = CountMap::zeroed(product_types);
        let mut completed = 0usize;

        let status = match self.collect(product_types, window, &mut counts, &mut completed) {
            Ok(()) => {
                info!(
                    source = %kind,
                    product_types = product_types.len(),
                    "数据源计数完成"
                );
                SourceStatus::Completed
            }
            Err(e) => {
                error!(
                    source = %kind,
                    completed,
                    remaining = product_types.len() - completed,
                    "{} Error: {}",
                    kind,
                    e
                );
                SourceStatus::Failed {
                    error: e.to_string(),
                }
            }
        };

        SourceOutcome {
            source: kind,
            counts,
            status,
            product_types_completed: completed,
        }
    }

    fn collect(
        &self,
        product_types: &[ProductType],
        window: &QueryWindow,
        counts: &mut CountMap,
        completed: &mut usize,
    ) -> SourceResult<()> {
        let mut connection = self.connector.open()?;
        connection.prepare(window)?;

        for product_type in product_types {
            let amount = connection.execute_count(*product_type, window)?;
            counts.add(*product_type, amount);
            *completed += 1;
        }

        Ok(())
    }
}
