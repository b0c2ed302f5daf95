//! 通用结构化 diff
//!
//! ResourceDiff 把一个 desired 值与 0/1 个 current 值配对：
//! - current 缺失 ⇒ 资源尚不存在，has_changes 恒为 true
//! - affected_root_property_types 按语义字段逐个比较顶层属性，无差异时为空
//!
//! 集合型字段统一用 BTreeSet / BTreeMap 存储，因此比较天然与顺序无关。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

/// 可比较的实体：按顶层语义属性给出差异集合
pub trait Diffable {
    /// 顶层属性的语义类别
    type Property: Ord + Clone + Debug + Send + Sync;

    /// 与 other 相比有差异的顶层属性；为空表示语义相等
    fn changed_properties(&self, other: &Self) -> BTreeSet<Self::Property>;
}

#[derive(Debug, Clone)]
pub struct ResourceDiff<T: Diffable> {
    desired: T,
    current: Option<T>,
    affected: BTreeSet<T::Property>,
}

impl<T: Diffable> ResourceDiff<T> {
    pub fn new(desired: T, current: Option<T>) -> Self {
        let affected = match &current {
            Some(current) => desired.changed_properties(current),
            None => BTreeSet::new(),
        };
        Self {
            desired,
            current,
            affected,
        }
    }

    pub fn desired(&self) -> &T {
        &self.desired
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn has_changes(&self) -> bool {
        self.current.is_none() || !self.affected.is_empty()
    }

    /// 深度相等：current 存在且所有顶层属性一致
    pub fn is_equal(&self) -> bool {
        !self.has_changes()
    }

    /// 资源尚不存在，需要创建
    pub fn is_create(&self) -> bool {
        self.current.is_none()
    }

    pub fn affected_root_property_types(&self) -> &BTreeSet<T::Property> {
        &self.affected
    }

    /// current 存在、有差异，且差异全部落在 allowed 之内
    pub fn only_affects(&self, allowed: &[T::Property]) -> bool {
        self.current.is_some()
            && !self.affected.is_empty()
            && self.affected.iter().all(|p| allowed.contains(p))
    }
}

/// 以 key（如区域名）为属性的映射 diff
impl<T: Diffable> Diffable for BTreeMap<String, T> {
    type Property = String;

    fn changed_properties(&self, other: &Self) -> BTreeSet<String> {
        let mut changed = BTreeSet::new();
        for (key, value) in self {
            match other.get(key) {
                Some(o) if value.changed_properties(o).is_empty() => {}
                _ => {
                    changed.insert(key.clone());
                }
            }
        }
        for key in other.keys() {
            if !self.contains_key(key) {
                changed.insert(key.clone());
            }
        }
        changed
    }
}

impl<T: Diffable + Clone> ResourceDiff<BTreeMap<String, T>> {
    /// 拆分为每个 desired key 的子 diff（current 中多出的 key 不产生子 diff）
    pub fn by_key(&self) -> Vec<(String, ResourceDiff<T>)> {
        self.desired
            .iter()
            .map(|(key, desired)| {
                let current = self.current.as_ref().and_then(|c| c.get(key)).cloned();
                (key.clone(), ResourceDiff::new(desired.clone(), current))
            })
            .collect()
    }
}
