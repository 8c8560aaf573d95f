// ==========================================
// 注入数据稳定性核对 - 计数映射
// ==========================================
// 职责: 单数据源计数 (CountMap) 与合并计数 (MergedCounts)
// 红线: 所有已配置产品类型先显式置 0,读取缺失键显式按 0 处理
// ==========================================

use crate::domain::types::ProductType;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

// ==========================================
// CountMap - 单数据源计数
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountMap {
    counts: HashMap<ProductType, u64>,
}

impl CountMap {
    /// 为每个已配置的产品类型建立显式 0 计数
    pub fn zeroed(product_types: &[ProductType]) -> Self {
        let mut counts = HashMap::with_capacity(product_types.len());
        for product_type in product_types {
            counts.insert(*product_type, 0);
        }
        Self { counts }
    }

    /// 累加某产品类型的计数
    pub fn add(&mut self, product_type: ProductType, amount: u64) {
        match self.counts.get_mut(&product_type) {
            Some(total) => *total += amount,
            None => {
                self.counts.insert(product_type, amount);
            }
        }
    }

    /// 读取计数（该数据源未配置的产品类型返回 0）
    pub fn get(&self, product_type: ProductType) -> u64 {
        self.counts.get(&product_type).copied().unwrap_or(0)
    }

    pub fn contains(&self, product_type: ProductType) -> bool {
        self.counts.contains_key(&product_type)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductType, u64)> + '_ {
        self.counts.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(ProductType, u64)> for CountMap {
    fn from_iter<I: IntoIterator<Item = (ProductType, u64)>>(iter: I) -> Self {
        let mut map = CountMap::default();
        for (product_type, amount) in iter {
            map.add(product_type, amount);
        }
        map
    }
}

// ==========================================
// MergedCounts - 跨数据源合并计数
// ==========================================
// 键集合 = 所有活跃数据源配置列表的并集,按首次出现顺序迭代
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergedCounts {
    order: Vec<ProductType>,
    totals: HashMap<ProductType, u64>,
}

/// 报表行（产品类型 + 合计）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergedRow {
    pub product_type: ProductType,
    pub total_received: u64,
}

impl MergedCounts {
    /// 以并集顺序建立全 0 合并结果
    pub fn zeroed(order: Vec<ProductType>) -> Self {
        let totals = order.iter().map(|p| (*p, 0)).collect();
        Self { order, totals }
    }

    /// 把一个数据源的计数加到并集中的每个键上
    pub fn accumulate(&mut self, source: &CountMap) {
        for product_type in &self.order {
            let contribution = source.get(*product_type);
            if let Some(total) = self.totals.get_mut(product_type) {
                *total += contribution;
            }
        }
    }

    pub fn get(&self, product_type: ProductType) -> u64 {
        self.totals.get(&product_type).copied().unwrap_or(0)
    }

    pub fn product_types(&self) -> &[ProductType] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn rows(&self) -> Vec<MergedRow> {
        self.order
            .iter()
            .map(|p| MergedRow {
                product_type: *p,
                total_received: self.get(*p),
            })
            .collect()
    }
}

/// 按首次出现顺序求多个产品类型列表的并集
pub fn union_product_types<'a, I>(lists: I) -> Vec<ProductType>
where
    I: IntoIterator<Item = &'a [ProductType]>,
{
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for list in lists {
        for product_type in list {
            if seen.insert(*product_type) {
                order.push(*product_type);
            }
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(codes: &[i64]) -> Vec<ProductType> {
        codes.iter().map(|c| ProductType::new(*c)).collect()
    }

    #[test]
    fn test_zeroed_has_every_configured_key() {
        let map = CountMap::zeroed(&pts(&[10, 20, 30]));
        assert_eq!(map.len(), 3);
        assert!(map.iter().all(|(_, v)| v == 0));
        assert!(map.contains(ProductType::new(20)));
    }

    #[test]
    fn test_get_missing_key_is_zero() {
        let map = CountMap::zeroed(&pts(&[1]));
        assert_eq!(map.get(ProductType::new(99)), 0);
        assert!(!map.contains(ProductType::new(99)));
    }

    #[test]
    fn test_add_accumulates() {
        let mut map = CountMap::zeroed(&pts(&[1]));
        map.add(ProductType::new(1), 2);
        map.add(ProductType::new(1), 3);
        assert_eq!(map.get(ProductType::new(1)), 5);
    }

    #[test]
    fn test_union_keeps_first_seen_order() {
        let a = pts(&[3, 1]);
        let b = pts(&[1, 2]);
        let c = pts(&[2, 4, 3]);
        let union = union_product_types([a.as_slice(), b.as_slice(), c.as_slice()]);
        assert_eq!(union, pts(&[3, 1, 2, 4]));
    }

    #[test]
    fn test_merged_accumulate_ignores_keys_outside_union() {
        let mut merged = MergedCounts::zeroed(pts(&[1, 2]));
        let source: CountMap = vec![(ProductType::new(1), 4), (ProductType::new(7), 9)]
            .into_iter()
            .collect();
        merged.accumulate(&source);

        assert_eq!(merged.get(ProductType::new(1)), 4);
        assert_eq!(merged.get(ProductType::new(2)), 0);
        assert_eq!(merged.get(ProductType::new(7)), 0);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_rows_follow_union_order() {
        let mut merged = MergedCounts::zeroed(pts(&[20, 10]));
        merged.accumulate(&vec![(ProductType::new(10), 3)].into_iter().collect());
        let rows = merged.rows();
        assert_eq!(rows[0].product_type, ProductType::new(20));
        assert_eq!(rows[0].total_received, 0);
        assert_eq!(rows[1].total_received, 3);
    }
}
