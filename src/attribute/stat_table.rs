//! 物品内嵌属性表（stats）的适配层。
//!
//! 属性表本身也是宿主对象：先按候选名找到它，再通过键列表属性或
//! `GetStatKeys` 方法发现键名，最后只处理名字里带 "weight" 的键。

use bevy::log::{debug, warn};

use super::accessor::AttributeSurface;
use crate::core::error::BoxError;

pub const TABLE_CANDIDATES: [&str; 3] = ["stats", "Stats", "_stats"];
pub const KEY_LIST_CANDIDATES: [&str; 5] = [
    "referenceKeys",
    "avaliableKeys",
    "availableKeys",
    "statKeys",
    "StatKeys",
];
pub const KEY_METHOD: &str = "GetStatKeys";
/// 发现不到任何键时，固定重量仍尝试写入的惯用键
pub const FALLBACK_WEIGHT_KEYS: [&str; 2] = ["Weight", "weight"];

/// 宿主属性表暴露的能力；`None` 表示宿主没有提供该能力
pub trait StatTable {
    fn key_list(&self, attribute: &str) -> Option<Vec<String>>;

    fn call_key_method(&self, method: &str) -> Option<Vec<String>>;

    fn get_float(&self, key: &str) -> Option<Result<f32, BoxError>>;

    fn set_float(&mut self, key: &str, value: f32) -> Option<Result<(), BoxError>>;
}

pub fn locate<S>(item: &mut S) -> Option<&mut dyn StatTable>
where
    S: AttributeSurface + ?Sized,
{
    let name = TABLE_CANDIDATES
        .iter()
        .copied()
        .find(|name| item.has_nested(name))?;
    item.nested_table(name)
}

/// 键名发现：先找键列表属性，再找方法；都没有就是空表
pub fn discover_keys(table: &dyn StatTable) -> Vec<String> {
    KEY_LIST_CANDIDATES
        .iter()
        .find_map(|attr| table.key_list(attr))
        .or_else(|| table.call_key_method(KEY_METHOD))
        .unwrap_or_default()
}

pub fn is_weight_key(key: &str) -> bool {
    !key.trim().is_empty() && key.to_lowercase().contains("weight")
}

pub fn weight_keys(table: &dyn StatTable) -> Vec<String> {
    discover_keys(table)
        .into_iter()
        .filter(|key| is_weight_key(key))
        .collect()
}

pub fn read_stat(table: &dyn StatTable, key: &str) -> Option<f32> {
    match table.get_float(key) {
        None => {
            debug!("[AmmoBox] {}", BoxError::MissingCapability("GetFloat"));
            None
        }
        Some(Ok(v)) if !v.is_nan() => Some(v),
        Some(Ok(_)) => None,
        Some(Err(err)) => {
            debug!("[AmmoBox] stat {key}: {err}");
            None
        }
    }
}

/// 单键写入，失败只记录，不影响其他键
pub fn write_stat(table: &mut dyn StatTable, key: &str, value: f32) -> bool {
    match table.set_float(key, value) {
        None => {
            debug!("[AmmoBox] {}", BoxError::MissingCapability("SetFloat"));
            false
        }
        Some(Ok(())) => true,
        Some(Err(err)) => {
            warn!("[AmmoBox] stat {key} 写入失败: {err}");
            false
        }
    }
}

/// 读取所有可读的重量键
pub fn read_weight_stats<S>(item: &mut S) -> Vec<(String, f32)>
where
    S: AttributeSurface + ?Sized,
{
    let Some(table) = locate(item) else {
        return Vec::new();
    };
    let table: &dyn StatTable = table;

    weight_keys(table)
        .into_iter()
        .filter_map(|key| read_stat(table, &key).map(|v| (key, v)))
        .collect()
}

/// 按快照逐键写回 `原值 × multiplier`，返回成功写入的键数
pub fn write_weight_stats<S>(item: &mut S, entries: &[(String, f32)], multiplier: f64) -> usize
where
    S: AttributeSurface + ?Sized,
{
    if entries.is_empty() {
        return 0;
    }
    let Some(table) = locate(item) else {
        return 0;
    };

    entries
        .iter()
        .filter(|(key, original)| {
            let value = (f64::from(*original) * multiplier) as f32;
            write_stat(&mut *table, key, value)
        })
        .count()
}

/// 把所有重量键钉成同一个值
pub fn pin_weight_stats<S>(item: &mut S, value: f32) -> usize
where
    S: AttributeSurface + ?Sized,
{
    let Some(table) = locate(item) else {
        return 0;
    };

    let keys = weight_keys(&*table);
    if keys.is_empty() {
        return FALLBACK_WEIGHT_KEYS
            .iter()
            .filter(|key| match table.set_float(key, value) {
                Some(Ok(())) => true,
                // 惯用键本来就可能不存在，只记 debug
                Some(Err(err)) => {
                    debug!("[AmmoBox] stat {key} 兜底写入失败: {err}");
                    false
                }
                None => {
                    debug!("[AmmoBox] {}", BoxError::MissingCapability("SetFloat"));
                    false
                }
            })
            .count();
    }

    keys.iter()
        .filter(|key| write_stat(&mut *table, key, value))
        .count()
}
