//! 改写前的重量快照。每个物品同一时间最多只有一份。

use bevy::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use crate::attribute::accessor::{AttributeSurface, read_first_number};
use crate::attribute::stat_table::read_weight_stats;

/// 参与减重的五个标量字段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WeightField {
    Weight,
    SelfWeight,
    UnitSelfWeight,
    TotalWeight,
    CachedTotalWeight,
}

impl WeightField {
    pub const ALL: [WeightField; 5] = [
        WeightField::Weight,
        WeightField::SelfWeight,
        WeightField::UnitSelfWeight,
        WeightField::TotalWeight,
        WeightField::CachedTotalWeight,
    ];

    /// 宿主各版本里可能使用的字段名，按优先级排列
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            WeightField::Weight => &["weight"],
            WeightField::SelfWeight => &["SelfWeight", "selfWeight"],
            WeightField::UnitSelfWeight => &["UnitSelfWeight", "unitSelfWeight"],
            WeightField::TotalWeight => &["TotalWeight", "totalWeight"],
            WeightField::CachedTotalWeight => &["_cachedTotalWeight", "cachedTotalWeight"],
        }
    }

    pub fn label(self) -> &'static str {
        self.candidates()[0]
    }
}

/// `None` 表示改写前就读不到，该字段全程不会被写入
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeightSnapshot {
    scalars: [Option<f64>; 5],
    stats: Vec<(String, f32)>,
}

impl WeightSnapshot {
    pub fn capture<S>(item: &mut S) -> Self
    where
        S: AttributeSurface + ?Sized,
    {
        let scalars = WeightField::ALL.map(|field| read_first_number(&*item, field.candidates()));
        Self {
            scalars,
            stats: read_weight_stats(item),
        }
    }

    pub fn scalar(&self, field: WeightField) -> Option<f64> {
        self.scalars[field as usize]
    }

    /// 改写前可读的字段
    pub fn scalars(&self) -> impl Iterator<Item = (WeightField, f64)> + '_ {
        WeightField::ALL
            .into_iter()
            .filter_map(|field| self.scalar(field).map(|v| (field, v)))
    }

    pub fn stats(&self) -> &[(String, f32)] {
        &self.stats
    }
}

/// 会话内的快照表，按实体句柄索引
#[derive(Resource, Default, Debug)]
pub struct SnapshotCache {
    entries: HashMap<Entity, WeightSnapshot>,
}

impl SnapshotCache {
    /// 已有快照就原样返回，绝不重新采集（否则减重会叠加）
    pub fn capture_if_absent<S>(&mut self, entity: Entity, item: &mut S) -> &WeightSnapshot
    where
        S: AttributeSurface + ?Sized,
    {
        self.entries
            .entry(entity)
            .or_insert_with(|| WeightSnapshot::capture(item))
    }

    /// 取出并删除；同一实体第二次调用返回 `None`
    pub fn consume(&mut self, entity: Entity) -> Option<WeightSnapshot> {
        self.entries.remove(&entity)
    }

    pub fn drain_all(&mut self) -> Vec<(Entity, WeightSnapshot)> {
        self.entries.drain().collect()
    }

    pub fn get(&self, entity: Entity) -> Option<&WeightSnapshot> {
        self.entries.get(&entity)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.entries.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::accessor::try_set;
    use crate::host::components::{HostItem, HostSchema};

    fn ammo() -> HostItem {
        HostItem::new(594, "9mm")
            .with_weights(2.0, 1.0, 0.5, 2.0)
            .with_stats(&[("Weight", 0.5), ("Damage", 20.0)])
    }

    #[test]
    fn capture_reads_scalars_and_weight_stats() {
        let snapshot = WeightSnapshot::capture(&mut ammo());
        assert_eq!(snapshot.scalar(WeightField::Weight), Some(2.0));
        assert_eq!(snapshot.scalar(WeightField::SelfWeight), Some(1.0));
        assert_eq!(snapshot.scalar(WeightField::UnitSelfWeight), Some(0.5));
        assert_eq!(snapshot.scalar(WeightField::CachedTotalWeight), Some(2.0));
        assert_eq!(snapshot.stats(), &[("Weight".to_string(), 0.5)]);
    }

    #[test]
    fn unreadable_fields_are_marked_absent_not_zero() {
        let mut item = HostItem::new(611, "shell")
            .with_weights(0.0, 0.0, 0.0, 0.0)
            .with_schema(HostSchema::Legacy);
        let snapshot = WeightSnapshot::capture(&mut item);
        assert_eq!(snapshot.scalar(WeightField::Weight), Some(0.0));
        assert_eq!(snapshot.scalar(WeightField::CachedTotalWeight), None);
        assert_eq!(snapshot.scalars().count(), 4);
    }

    #[test]
    fn capture_is_not_repeated() {
        let mut cache = SnapshotCache::default();
        let e = Entity::from_raw(3);
        let mut item = ammo();
        cache.capture_if_absent(e, &mut item);
        try_set(&mut item, "weight", 0.4f32);
        let again = cache.capture_if_absent(e, &mut item);
        assert_eq!(again.scalar(WeightField::Weight), Some(2.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn consume_is_single_use() {
        let mut cache = SnapshotCache::default();
        let e = Entity::from_raw(3);
        cache.capture_if_absent(e, &mut ammo());
        assert!(cache.consume(e).is_some());
        assert!(cache.consume(e).is_none());
    }

    #[test]
    fn drain_empties_the_cache() {
        let mut cache = SnapshotCache::default();
        cache.capture_if_absent(Entity::from_raw(1), &mut ammo());
        cache.capture_if_absent(Entity::from_raw(2), &mut ammo());
        let drained = cache.drain_all();
        assert_eq!(drained.len(), 2);
        assert!(cache.is_empty());
        assert!(!cache.contains(Entity::from_raw(1)));
    }

    #[test]
    fn snapshot_serializes_for_dumps() {
        let snapshot = WeightSnapshot::capture(&mut ammo());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["scalars"][0], 2.0);
        assert_eq!(json["stats"][0][0], "Weight");
    }
}
