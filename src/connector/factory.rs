// ==========================================
// 注入数据稳定性核对 - 数据源装配
// ==========================================
// 职责: 根据 ConfigView 决定活跃数据源并构造对应连接器
// 规则: 节存在且产品类型列表非空 => 活跃
// 规则: 活跃节的凭据缺失不致命,该数据源在打开连接时报告失败
// ==========================================

use crate::config::{
    ConfigResult, ConfigView, InjectionParams, LegacyCredentials, PartitionedCredentials,
    WarehouseCredentials,
};
use crate::connector::error::{SourceError, SourceResult};
use crate::connector::{
    LegacyConnector, PartitionedConnector, SourceConnection, SourceConnector, WarehouseConnector,
};
use crate::domain::SourceKind;
use crate::engine::ActiveSource;

// ==========================================
// UnavailableConnector - 无法构造的数据源
// ==========================================
// 打开连接时总是返回 ConnectionError
pub struct UnavailableConnector {
    kind: SourceKind,
    reason: String,
}

impl UnavailableConnector {
    pub fn new(kind: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

impl SourceConnector for UnavailableConnector {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn open(&self) -> SourceResult<Box<dyn SourceConnection + '_>> {
        Err(SourceError::Connection(self.reason.clone()))
    }
}

/// 为某数据源构造连接器（凭据错误降级为 UnavailableConnector）
pub fn build_connector(kind: SourceKind, config: &ConfigView) -> Box<dyn SourceConnector> {
    let built: ConfigResult<Box<dyn SourceConnector>> = match kind {
        SourceKind::Warehouse => WarehouseCredentials::from_config(config)
            .map(|c| Box::new(WarehouseConnector::new(c)) as Box<dyn SourceConnector>),
        SourceKind::PartitionedEngine => PartitionedCredentials::from_config(config)
            .map(|c| Box::new(PartitionedConnector::new(c)) as Box<dyn SourceConnector>),
        SourceKind::LegacyRdbms => LegacyCredentials::from_config(config)
            .map(|c| Box::new(LegacyConnector::new(c)) as Box<dyn SourceConnector>),
    };

    built.unwrap_or_else(|e| {
        tracing::warn!(source = %kind, error = %e, "数据源凭据配置不完整");
        Box::new(UnavailableConnector::new(kind, format!("配置错误: {}", e)))
    })
}

/// 按固定顺序装配全部活跃数据源
///
/// # 错误
/// - 活跃节的产品类型列表缺失或格式错误（致命）
pub fn build_active_sources(
    config: &ConfigView,
    injection: &InjectionParams,
) -> ConfigResult<Vec<ActiveSource>> {
    let mut sources = Vec::new();

    for kind in SourceKind::ALL {
        let product_types = config.product_types(kind)?;
        if product_types.is_empty() {
            tracing::info!(source = %kind, section = kind.section(), "数据源未配置,跳过");
            continue;
        }

        sources.push(ActiveSource::new(
            build_connector(kind, config),
            product_types,
            injection.window_for(kind),
        ));
    }

    Ok(sources)
}
