// ==========================================
// 注入数据稳定性核对 - 数据源连接层
// ==========================================
// 职责: 定义数据源连接接口,三种存储各自的计数查询方言
// 红线: 连接层只做查询,不含合并逻辑
// 红线: 业务值一律参数绑定,不拼接进 SQL 文本
// ==========================================

pub mod error;
pub mod factory;
pub mod legacy;
pub mod partitioned;
pub mod warehouse;

use crate::domain::{ProductType, QueryWindow, SourceKind};
use std::fmt::Debug;
use std::time::Duration;

// 重导出
pub use error::{SourceError, SourceResult};
pub use factory::{build_active_sources, UnavailableConnector};
pub use legacy::LegacyConnector;
pub use partitioned::{PartitionedConnector, PrestoClient};
pub use warehouse::WarehouseConnector;

// ==========================================
// SourceConnector Trait
// ==========================================
// 用途: 持有凭据,按需打开一个数据源连接
// 实现者: WarehouseConnector / PartitionedConnector / LegacyConnector
pub trait SourceConnector {
    /// 数据源种类
    fn kind(&self) -> SourceKind;

    /// 打开连接
    ///
    /// # 错误
    /// - SourceError::Connection: 存储不可达或凭据被拒绝
    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>>;
}

// ==========================================
// SourceConnection Trait
// ==========================================
// 用途: 一次批量计数期间独占的连接
// 释放: 连接对象 Drop 即释放,覆盖所有退出路径
pub trait SourceConnection {
    /// 计数前的准备（分区引擎在此发现物理表）
    fn prepare(&mut self, _window: &QueryWindow) -> SourceResult<()> {
        Ok(())
    }

    /// 执行单个产品类型的计数查询
    ///
    /// # 返回
    /// - Ok(0): 查询成功但无匹配行
    ///
    /// # 错误
    /// - SourceError::Query: 查询非法或存储端报错
    fn execute_count(
        &mut self,
        product_type: ProductType,
        window: &QueryWindow,
    ) -> SourceResult<u64>;
}

/// 记录即将执行的查询（审计追踪: 完整查询文本 + 绑定参数）
pub(crate) fn log_query(kind: SourceKind, query: &str, params: &dyn Debug) {
    tracing::info!(
        source = %kind,
        query = %query,
        params = ?params,
        "执行 {} 查询",
        kind
    );
}

/// 记录查询结果并计入性能统计
pub(crate) fn log_result(
    kind: SourceKind,
    query: &str,
    product_type: ProductType,
    table: Option<&str>,
    amount: u64,
    elapsed: Duration,
) {
    crate::perf::record_query(query, elapsed);
    match table {
        Some(table) => tracing::info!(
            source = %kind,
            %product_type,
            table,
            amount,
            "{} 查询结果: 表 {} 产品类型 {} = {}",
            kind,
            table,
            product_type,
            amount
        ),
        None => tracing::info!(
            source = %kind,
            %product_type,
            amount,
            "{} 查询结果: 产品类型 {} = {}",
            kind,
            product_type,
            amount
        ),
    }
}

/// 把 COUNT 结果转换为非负计数
pub(crate) fn non_negative(kind: SourceKind, value: i64) -> SourceResult<u64> {
    u64::try_from(value)
        .map_err(|_| SourceError::Protocol(format!("{} 返回了负数计数: {}", kind, value)))
}
