// ==========================================
// 注入数据稳定性核对 - 领域类型定义
// ==========================================
// 职责: 产品类型（跨数据源关联键）与数据源种类
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 产品类型 (Product Type)
// ==========================================
// 数值编码,三个数据源之间的关联键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductType(i64);

impl ProductType {
    pub fn new(code: i64) -> Self {
        Self(code)
    }

    /// 数值编码（用于参数绑定）
    pub fn code(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProductType {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(ProductType)
    }
}

impl From<i64> for ProductType {
    fn from(code: i64) -> Self {
        Self(code)
    }
}

// ==========================================
// 数据源种类 (Source Kind)
// ==========================================
// 执行顺序固定: Warehouse -> PartitionedEngine -> LegacyRdbms
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Warehouse,         // Greenplum 行存数仓
    PartitionedEngine, // Presto (Hive 按日分表)
    LegacyRdbms,       // Sybase ASE (ODBC)
}

impl SourceKind {
    /// 固定执行顺序
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Warehouse,
        SourceKind::PartitionedEngine,
        SourceKind::LegacyRdbms,
    ];

    /// 配置文件中的节名
    pub fn section(&self) -> &'static str {
        match self {
            SourceKind::Warehouse => "gpdb",
            SourceKind::PartitionedEngine => "presto",
            SourceKind::LegacyRdbms => "ase",
        }
    }

    /// 查询下界是否需要回看（Presto 直接使用注入时间）
    pub fn uses_lookback(&self) -> bool {
        !matches!(self, SourceKind::PartitionedEngine)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Warehouse => write!(f, "GPDB"),
            SourceKind::PartitionedEngine => write!(f, "Presto (Hive)"),
            SourceKind::LegacyRdbms => write!(f, "ASE"),
        }
    }
}
