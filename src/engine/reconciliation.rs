// ==========================================
// 注入数据稳定性核对 - 核对引擎
// ==========================================
// 职责: 依次运行活跃数据源的计数聚合,按产品类型求和合并
// 顺序: Warehouse -> PartitionedEngine -> LegacyRdbms（求和可交换,顺序不影响结果）
// 红线: 无状态单次执行,无重试,无中间状态持久化
// ==========================================

use crate::config::{ConfigResult, ConfigView, InjectionParams};
use crate::connector::{build_active_sources, SourceConnector};
use crate::domain::{
    union_product_types, CountMap, MergedCounts, ProductType, QueryWindow, SourceKind,
};
use crate::engine::aggregator::{CountAggregator, SourceOutcome};
use serde_json::{json, Value};
use tracing::{info, info_span, warn};
use uuid::Uuid;

// ==========================================
// ActiveSource - 活跃数据源
// ==========================================
pub struct ActiveSource {
    connector: Box<dyn SourceConnector>,
    product_types: Vec<ProductType>,
    window: QueryWindow,
}

impl ActiveSource {
    pub fn new(
        connector: Box<dyn SourceConnector>,
        product_types: Vec<ProductType>,
        window: QueryWindow,
    ) -> Self {
        Self {
            connector,
            product_types,
            window,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.connector.kind()
    }

    pub fn product_types(&self) -> &[ProductType] {
        &self.product_types
    }

    pub fn window(&self) -> &QueryWindow {
        &self.window
    }
}

// ==========================================
// ReconciliationReport - 核对结果
// ==========================================
#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub run_id: Uuid,
    pub merged: MergedCounts,
    pub outcomes: Vec<SourceOutcome>,
}

impl ReconciliationReport {
    /// 报表行顺序（并集构造顺序）
    pub fn product_types(&self) -> &[ProductType] {
        self.merged.product_types()
    }

    pub fn outcome(&self, kind: SourceKind) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|o| o.source == kind)
    }

    pub fn failed_sources(&self) -> Vec<SourceKind> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(|o| o.source)
            .collect()
    }

    /// 摘要 JSON（--summary-json 输出）
    pub fn summary_json(&self) -> Value {
        let sources: Vec<Value> = self
            .outcomes
            .iter()
            .map(|o| {
                let mut counts: Vec<(ProductType, u64)> = o.counts.iter().collect();
                counts.sort();
                json!({
                    "source": o.source,
                    "outcome": o.status,
                    "product_types_completed": o.product_types_completed,
                    "counts": counts
                        .into_iter()
                        .map(|(p, n)| json!({ "product_type": p, "count": n }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        json!({
            "run_id": self.run_id.to_string(),
            "merged": self.merged.rows(),
            "sources": sources,
        })
    }
}

/// 合并多个数据源的计数
///
/// 键集合 = `product_types`（各活跃数据源配置列表的并集）
/// 值 = 各数据源对该键的计数之和,数据源未配置该键时按 0 计
pub fn merge_counts(product_types: Vec<ProductType>, sources: &[&CountMap]) -> MergedCounts {
    let mut merged = MergedCounts::zeroed(product_types);
    for counts in sources {
        merged.accumulate(counts);
    }
    merged
}

// ==========================================
// ReconciliationEngine
// ==========================================
pub struct ReconciliationEngine {
    sources: Vec<ActiveSource>,
}

impl ReconciliationEngine {
    /// 创建引擎（产品类型列表为空的数据源视为未激活）
    pub fn new(sources: Vec<ActiveSource>) -> Self {
        let sources = sources
            .into_iter()
            .filter(|s| {
                if s.product_types.is_empty() {
                    info!(source = %s.kind(), "产品类型列表为空,数据源未激活");
                    false
                } else {
                    true
                }
            })
            .collect();
        Self { sources }
    }

    /// 按配置装配引擎
    pub fn from_config(config: &ConfigView, injection: &InjectionParams) -> ConfigResult<Self> {
        Ok(Self::new(build_active_sources(config, injection)?))
    }

    pub fn active_sources(&self) -> Vec<SourceKind> {
        self.sources.iter().map(ActiveSource::kind).collect()
    }

    /// 并集产品类型（按数据源执行顺序、列表内顺序首次出现）
    pub fn product_types(&self) -> Vec<ProductType> {
        union_product_types(self.sources.iter().map(|s| s.product_types.as_slice()))
    }

    /// 执行一次核对
    pub fn run(&self) -> ReconciliationReport {
        let run_id = Uuid::new_v4();
        let span = info_span!("reconciliation", %run_id);
        let _enter = span.enter();

        info!(
            sources = ?self.active_sources(),
            "开始核对,活跃数据源 {} 个",
            self.sources.len()
        );

        let outcomes: Vec<SourceOutcome> = self
            .sources
            .iter()
            .map(|source| {
                CountAggregator::new(source.connector.as_ref())
                    .run(&source.product_types, &source.window)
            })
            .collect();

        let maps: Vec<&CountMap> = outcomes.iter().map(|o| &o.counts).collect();
        let merged = merge_counts(self.product_types(), &maps);

        let report = ReconciliationReport {
            run_id,
            merged,
            outcomes,
        };

        let failed = report.failed_sources();
        if !failed.is_empty() {
            warn!(failed_sources = ?failed, "部分数据源失败,其计数按 0 计入");
        }
        for row in report.merged.rows() {
            info!(
                product_type = %row.product_type,
                total_received = row.total_received,
                "合并结果"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(i64, u64)]) -> CountMap {
        entries
            .iter()
            .map(|(p, n)| (ProductType::new(*p), *n))
            .collect()
    }

    fn pts(codes: &[i64]) -> Vec<ProductType> {
        codes.iter().map(|c| ProductType::new(*c)).collect()
    }

    #[test]
    fn test_merge_sums_per_key_with_default_zero() {
        let w = map(&[(1, 2)]);
        let e = map(&[(1, 1), (2, 4)]);
        let l = map(&[(2, 1)]);
        let merged = merge_counts(pts(&[1, 2]), &[&w, &e, &l]);

        assert_eq!(merged.get(ProductType::new(1)), 3);
        assert_eq!(merged.get(ProductType::new(2)), 5);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let w = map(&[(1, 2), (3, 7)]);
        let e = map(&[(1, 1), (2, 4)]);
        let l = map(&[(2, 1), (3, 1)]);
        let keys = pts(&[1, 3, 2]);

        let forward = merge_counts(keys.clone(), &[&w, &e, &l]);
        let reverse = merge_counts(keys.clone(), &[&l, &e, &w]);
        let shuffled = merge_counts(keys, &[&e, &w, &l]);

        assert_eq!(forward, reverse);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_merge_without_sources_is_all_zero() {
        let merged = merge_counts(pts(&[5, 6]), &[]);
        assert_eq!(merged.rows().iter().map(|r| r.total_received).sum::<u64>(), 0);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_empty_engine_produces_empty_report() {
        let engine = ReconciliationEngine::new(Vec::new());
        let report = engine.run();
        assert!(report.merged.is_empty());
        assert!(report.outcomes.is_empty());
        assert_eq!(report.summary_json()["merged"], json!([]));
    }
}
