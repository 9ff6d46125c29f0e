//! 可逆减重与固定总重。
//!
//! 每次改写都在同一个系统调用内完成，宿主看不到写了一半的状态。单个字段写失败只影响它自己。

use bevy::log::{debug, info};
use bevy::prelude::Entity;

use super::snapshot::{SnapshotCache, WeightField, WeightSnapshot};
use crate::attribute::accessor::{AttributeSurface, get_float, try_invoke, try_set_first};
use crate::attribute::stat_table::{self, pin_weight_stats, write_weight_stats};

/// 宿主自带的重量重算方法，存在就调用
pub const RECALC_HOOKS: [&str; 2] = ["RecalculateWeight", "RecalculateTotalWeight"];

/// 按快照原值乘以 `1 - reduction` 写入。重复调用不会叠加。
pub fn apply_reduced_weight<S>(cache: &mut SnapshotCache, entity: Entity, item: &mut S, reduction: f32)
where
    S: AttributeSurface + ?Sized,
{
    let snapshot = cache.capture_if_absent(entity, item).clone();
    let multiplier = 1.0 - f64::from(reduction);
    write_scaled(item, &snapshot, multiplier);
    recalculate(item);
}

/// 消费快照并写回原值；没有快照时什么都不做
pub fn restore_weight<S>(cache: &mut SnapshotCache, entity: Entity, item: &mut S) -> bool
where
    S: AttributeSurface + ?Sized,
{
    let Some(snapshot) = cache.consume(entity) else {
        return false;
    };
    restore_from(item, &snapshot);
    true
}

pub fn restore_from<S>(item: &mut S, snapshot: &WeightSnapshot)
where
    S: AttributeSurface + ?Sized,
{
    write_scaled(item, snapshot, 1.0);
    recalculate(item);
}

/// 无条件把容器的总重钉成固定值
pub fn enforce_fixed_aggregate_weight<S>(item: &mut S, fixed: f32)
where
    S: AttributeSurface + ?Sized,
{
    for field in WeightField::ALL {
        try_set_first(item, field.candidates(), fixed);
    }
    pin_weight_stats(item, fixed);
    recalculate(item);
}

pub fn recalculate<S>(item: &mut S)
where
    S: AttributeSurface + ?Sized,
{
    for hook in RECALC_HOOKS {
        try_invoke(item, hook);
    }
}

fn write_scaled<S>(item: &mut S, snapshot: &WeightSnapshot, multiplier: f64)
where
    S: AttributeSurface + ?Sized,
{
    for (field, original) in snapshot.scalars() {
        if !try_set_first(item, field.candidates(), original * multiplier) {
            debug!("[AmmoBox] {} 不可写，保持原样", field.label());
        }
    }
    write_weight_stats(item, snapshot.stats(), multiplier);
}

/// 调试用：打印当前所有重量字段
pub fn dump_weights<S>(item: &mut S, name: &str, label: &str, snapshot: Option<&WeightSnapshot>)
where
    S: AttributeSurface + ?Sized,
{
    let fields: Vec<String> = WeightField::ALL
        .iter()
        .map(|f| format!("{}={}", f.label(), get_float(&*item, f.label())))
        .collect();
    info!("[AmmoBox][WeightDump:{label}] {name} {}", fields.join(" "));

    if let Some(table) = stat_table::locate(item) {
        let table: &dyn stat_table::StatTable = table;
        for key in stat_table::weight_keys(table) {
            let value = stat_table::read_stat(table, &key).unwrap_or(f32::NAN);
            info!("[AmmoBox][WeightDump:{label}] stat {key}={value}");
        }
    }

    if let Some(snapshot) = snapshot {
        match serde_json::to_string(snapshot) {
            Ok(json) => info!("[AmmoBox][WeightDump:{label}] snapshot {json}"),
            Err(err) => debug!("[AmmoBox] snapshot 序列化失败: {err}"),
        }
    }
}
