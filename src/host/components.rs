//! 宿主物品模型。
//!
//! `HostItem` 的重量字段是私有的，只能通过 [`AttributeSurface`] 按名字访问；
//! 不同宿主版本（[`HostSchema`]）的字段名、类型与可写性各不相同。

use bevy::prelude::*;
use serde::Deserialize;

use crate::attribute::accessor::{AttributeSurface, FieldDecl};
use crate::attribute::stat_table::{KEY_METHOD, StatTable};
use crate::attribute::value::{Value, ValueKind};
use crate::core::error::BoxError;

/// 物品标签
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &Tag) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

/// 已知的宿主字段布局版本
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
pub enum HostSchema {
    #[default]
    Current,
    Legacy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemField {
    TypeId,
    DisplayNameRaw,
    DescriptionRaw,
    FromInfoKey,
    NeedInspection,
    Inspected,
    Value,
    Weight,
    SelfWeight,
    UnitSelfWeight,
    TotalWeight,
    CachedTotalWeight,
}

type FieldRow = (&'static str, ItemField, FieldDecl);

const CURRENT_FIELDS: &[FieldRow] = &[
    ("TypeID", ItemField::TypeId, FieldDecl::rw(ValueKind::Int)),
    ("DisplayNameRaw", ItemField::DisplayNameRaw, FieldDecl::rw(ValueKind::Text)),
    ("DescriptionRaw", ItemField::DescriptionRaw, FieldDecl::rw(ValueKind::Text)),
    ("FromInfoKey", ItemField::FromInfoKey, FieldDecl::rw(ValueKind::Bool)),
    ("NeedInspection", ItemField::NeedInspection, FieldDecl::rw(ValueKind::Bool)),
    ("Inspected", ItemField::Inspected, FieldDecl::rw(ValueKind::Bool)),
    ("Value", ItemField::Value, FieldDecl::rw(ValueKind::Int)),
    ("weight", ItemField::Weight, FieldDecl::rw(ValueKind::Float)),
    ("SelfWeight", ItemField::SelfWeight, FieldDecl::rw(ValueKind::Float)),
    ("UnitSelfWeight", ItemField::UnitSelfWeight, FieldDecl::rw(ValueKind::Double)),
    ("TotalWeight", ItemField::TotalWeight, FieldDecl::rw(ValueKind::Float)),
    ("_cachedTotalWeight", ItemField::CachedTotalWeight, FieldDecl::rw(ValueKind::Float)),
];

// 旧版本：typeID 小写，TotalWeight 只有 getter，没有缓存字段
const LEGACY_FIELDS: &[FieldRow] = &[
    ("typeID", ItemField::TypeId, FieldDecl::rw(ValueKind::Int)),
    ("DisplayNameRaw", ItemField::DisplayNameRaw, FieldDecl::rw(ValueKind::Text)),
    ("DescriptionRaw", ItemField::DescriptionRaw, FieldDecl::rw(ValueKind::Text)),
    ("Value", ItemField::Value, FieldDecl::rw(ValueKind::Int)),
    ("weight", ItemField::Weight, FieldDecl::rw(ValueKind::Float)),
    ("SelfWeight", ItemField::SelfWeight, FieldDecl::rw(ValueKind::Float)),
    ("UnitSelfWeight", ItemField::UnitSelfWeight, FieldDecl::rw(ValueKind::Float)),
    ("TotalWeight", ItemField::TotalWeight, FieldDecl::ro(ValueKind::Float)),
];

impl HostSchema {
    fn fields(self) -> &'static [FieldRow] {
        match self {
            HostSchema::Current => CURRENT_FIELDS,
            HostSchema::Legacy => LEGACY_FIELDS,
        }
    }

    fn resolve(self, name: &str) -> Option<(ItemField, FieldDecl)> {
        self.fields()
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, field, decl)| (*field, *decl))
    }

    fn stats_attribute(self) -> &'static str {
        match self {
            HostSchema::Current => "stats",
            HostSchema::Legacy => "Stats",
        }
    }

    fn key_exposure(self) -> KeyExposure {
        match self {
            HostSchema::Current => KeyExposure::Attribute("availableKeys"),
            HostSchema::Legacy => KeyExposure::Method,
        }
    }
}

/// 属性表如何暴露键名
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyExposure {
    Attribute(&'static str),
    Method,
    Hidden,
}

#[derive(Clone, Debug, PartialEq)]
struct StatEntry {
    key: String,
    value: f32,
    locked: bool,
}

/// 物品内嵌的属性表
#[derive(Clone, Debug, PartialEq)]
pub struct StatCollection {
    entries: Vec<StatEntry>,
    exposure: KeyExposure,
}

impl StatCollection {
    pub fn new(exposure: KeyExposure) -> Self {
        Self {
            entries: Vec::new(),
            exposure,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: f32) -> Self {
        self.entries.push(StatEntry {
            key: key.into(),
            value,
            locked: false,
        });
        self
    }

    /// 写入时宿主会抛错的键
    pub fn lock(mut self, key: &str) -> Self {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.key == key) {
            entry.locked = true;
        }
        self
    }

    pub fn value(&self, key: &str) -> Option<f32> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.value)
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }
}

impl StatTable for StatCollection {
    fn key_list(&self, attribute: &str) -> Option<Vec<String>> {
        match self.exposure {
            KeyExposure::Attribute(name) if name == attribute => Some(self.keys()),
            _ => None,
        }
    }

    fn call_key_method(&self, method: &str) -> Option<Vec<String>> {
        (self.exposure == KeyExposure::Method && method == KEY_METHOD).then(|| self.keys())
    }

    fn get_float(&self, key: &str) -> Option<Result<f32, BoxError>> {
        Some(
            self.value(key)
                .ok_or_else(|| BoxError::AttributeNotFound(key.to_string())),
        )
    }

    fn set_float(&mut self, key: &str, value: f32) -> Option<Result<(), BoxError>> {
        let result = match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) if entry.locked => Err(BoxError::host_fault(
                format!("SetFloat({key})"),
                "stat is read-only",
            )),
            Some(entry) => {
                entry.value = value;
                Ok(())
            }
            None => Err(BoxError::AttributeNotFound(key.to_string())),
        };
        Some(result)
    }
}

/// 宿主物品实例
#[derive(Component, Clone, Debug)]
pub struct HostItem {
    pub display_name: String,
    pub tags: Vec<Tag>,
    pub stack_count: u32,
    pub icon: Option<Handle<Image>>,
    schema: HostSchema,
    type_id: i32,
    description_raw: String,
    from_info_key: bool,
    need_inspection: bool,
    inspected: bool,
    value: i32,
    weight: f32,
    self_weight: f32,
    unit_self_weight: f64,
    total_weight: f32,
    cached_total_weight: f32,
    stats: Option<StatCollection>,
}

impl HostItem {
    pub fn new(type_id: i32, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            tags: Vec::new(),
            stack_count: 1,
            icon: None,
            schema: HostSchema::Current,
            type_id,
            description_raw: String::new(),
            from_info_key: false,
            need_inspection: true,
            inspected: false,
            value: 0,
            weight: 0.0,
            self_weight: 0.0,
            unit_self_weight: 0.0,
            total_weight: 0.0,
            cached_total_weight: 0.0,
            stats: None,
        }
    }

    pub fn with_schema(mut self, schema: HostSchema) -> Self {
        self.schema = schema;
        if let Some(stats) = self.stats.as_mut() {
            if stats.exposure != KeyExposure::Hidden {
                stats.exposure = schema.key_exposure();
            }
        }
        self
    }

    /// 单件重量；`weight`、`SelfWeight`、总重都按堆叠数推算
    pub fn with_unit_weight(mut self, unit: f32) -> Self {
        self.unit_self_weight = f64::from(unit);
        self.restack();
        self
    }

    pub fn with_weights(mut self, weight: f32, self_weight: f32, unit: f32, total: f32) -> Self {
        self.weight = weight;
        self.self_weight = self_weight;
        self.unit_self_weight = f64::from(unit);
        self.total_weight = total;
        self.cached_total_weight = total;
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| Tag::new(*t)).collect();
        self
    }

    pub fn with_value(mut self, value: i32) -> Self {
        self.value = value;
        self
    }

    /// 挂上属性表，键名暴露方式跟随宿主版本
    pub fn with_stats(mut self, entries: &[(&str, f32)]) -> Self {
        let table = entries
            .iter()
            .fold(StatCollection::new(self.schema.key_exposure()), |t, (k, v)| {
                t.with(*k, *v)
            });
        self.stats = Some(table);
        self
    }

    pub fn with_locked_stat(mut self, key: &str) -> Self {
        self.stats = self.stats.take().map(|t| t.lock(key));
        self
    }

    pub fn with_stat_table(mut self, table: StatCollection) -> Self {
        self.stats = Some(table);
        self
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn schema(&self) -> HostSchema {
        self.schema
    }

    pub fn stats(&self) -> Option<&StatCollection> {
        self.stats.as_ref()
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|t| t.matches(tag))
    }

    /// 堆叠数变化后按单件重量重算
    pub(crate) fn restack(&mut self) {
        let stacked = (self.unit_self_weight * f64::from(self.stack_count)) as f32;
        self.self_weight = stacked;
        self.weight = stacked;
        self.total_weight = stacked;
        self.cached_total_weight = stacked;
    }

    /// 宿主自己的总重（供宿主内部重算使用）
    pub(crate) fn host_total_weight(&self) -> f32 {
        self.total_weight
    }

    /// 宿主内部的重量汇总：自重 + 子物品总重
    pub(crate) fn refresh_total(&mut self, children: f32) {
        self.total_weight = self.self_weight + children;
        self.cached_total_weight = self.total_weight;
    }

    fn read_field(&self, field: ItemField, kind: ValueKind) -> Value {
        match field {
            ItemField::TypeId => Value::Int(self.type_id),
            ItemField::DisplayNameRaw => Value::Text(self.display_name.clone()),
            ItemField::DescriptionRaw => Value::Text(self.description_raw.clone()),
            ItemField::FromInfoKey => Value::Bool(self.from_info_key),
            ItemField::NeedInspection => Value::Bool(self.need_inspection),
            ItemField::Inspected => Value::Bool(self.inspected),
            ItemField::Value => Value::Int(self.value),
            ItemField::Weight => Value::Float(self.weight),
            ItemField::SelfWeight => Value::Float(self.self_weight),
            ItemField::UnitSelfWeight => match kind {
                ValueKind::Double => Value::Double(self.unit_self_weight),
                _ => Value::Float(self.unit_self_weight as f32),
            },
            ItemField::TotalWeight => Value::Float(self.total_weight),
            ItemField::CachedTotalWeight => Value::Float(self.cached_total_weight),
        }
    }

    fn write_field(&mut self, field: ItemField, value: Value) -> Result<(), BoxError> {
        let mismatch = |value: &Value| {
            BoxError::host_fault(
                format!("set {field:?}"),
                format!("unexpected {}", value.kind().name()),
            )
        };

        match (field, value) {
            (ItemField::TypeId, Value::Int(v)) => self.type_id = v,
            (ItemField::Value, Value::Int(v)) => self.value = v,
            (ItemField::DisplayNameRaw, Value::Text(s)) => self.display_name = s,
            (ItemField::DescriptionRaw, Value::Text(s)) => self.description_raw = s,
            (ItemField::FromInfoKey, Value::Bool(b)) => self.from_info_key = b,
            (ItemField::NeedInspection, Value::Bool(b)) => self.need_inspection = b,
            (ItemField::Inspected, Value::Bool(b)) => self.inspected = b,
            (ItemField::UnitSelfWeight, value) => {
                self.unit_self_weight = value.as_number().ok_or_else(|| mismatch(&value))?;
            }
            (field, Value::Float(v)) => match field {
                ItemField::Weight => self.weight = v,
                ItemField::SelfWeight => self.self_weight = v,
                ItemField::TotalWeight => self.total_weight = v,
                ItemField::CachedTotalWeight => self.cached_total_weight = v,
                _ => return Err(mismatch(&Value::Float(v))),
            },
            (_, value) => return Err(mismatch(&value)),
        }
        Ok(())
    }
}

impl AttributeSurface for HostItem {
    fn declaration(&self, name: &str) -> Option<FieldDecl> {
        self.schema.resolve(name).map(|(_, decl)| decl)
    }

    fn read_attribute(&self, name: &str) -> Option<Value> {
        let (field, decl) = self.schema.resolve(name)?;
        Some(self.read_field(field, decl.kind))
    }

    fn write_attribute(&mut self, name: &str, value: Value) -> Result<(), BoxError> {
        let (field, _) = self
            .schema
            .resolve(name)
            .ok_or_else(|| BoxError::AttributeNotFound(name.to_string()))?;
        self.write_field(field, value)
    }

    fn invoke(&mut self, method: &str) -> Option<Result<(), BoxError>> {
        match (self.schema, method) {
            (HostSchema::Current, "RecalculateTotalWeight") => {
                self.cached_total_weight = self.total_weight;
                Some(Ok(()))
            }
            // 旧版本的重算依赖背包上下文，单独调用会抛错
            (HostSchema::Legacy, "RecalculateWeight") => Some(Err(BoxError::host_fault(
                method,
                "item is not attached to an inventory",
            ))),
            _ => None,
        }
    }

    fn has_nested(&self, name: &str) -> bool {
        self.stats.is_some() && name == self.schema.stats_attribute()
    }

    fn nested_table(&mut self, name: &str) -> Option<&mut dyn StatTable> {
        if name != self.schema.stats_attribute() {
            return None;
        }
        match self.stats.as_mut() {
            Some(stats) => Some(stats),
            None => None,
        }
    }
}

/// 容器槽位：最多容纳一个物品
#[derive(Component, Clone, Debug)]
pub struct Slot {
    pub key: String,
    pub master: Entity,
    pub require_tags: Vec<Tag>,
    pub exclude_tags: Vec<Tag>,
    content: Option<Entity>,
}

impl Slot {
    pub fn new(key: impl Into<String>, master: Entity) -> Self {
        Self {
            key: key.into(),
            master,
            require_tags: Vec::new(),
            exclude_tags: Vec::new(),
            content: None,
        }
    }

    pub fn content(&self) -> Option<Entity> {
        self.content
    }

    /// 宿主自带的放入检查：必须带全部 require 标签，且不带任何 exclude 标签
    pub fn can_plug(&self, item: &HostItem) -> bool {
        self.require_tags.iter().all(|t| item.has_tag(t))
            && !self.exclude_tags.iter().any(|t| item.has_tag(t))
    }

    /// 放入物品，返回被替换的旧物品
    pub fn plug(&mut self, item: Entity) -> Option<Entity> {
        self.content.replace(item)
    }

    pub fn unplug(&mut self) -> Option<Entity> {
        self.content.take()
    }
}

/// 物品拥有的槽位列表
#[derive(Component, Clone, Debug, Default)]
pub struct SlotCollection {
    pub slots: Vec<Entity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::accessor::{get_float, try_invoke, try_set};
    use crate::attribute::stat_table::{read_weight_stats, weight_keys};

    #[test]
    fn current_schema_exposes_private_weight_fields() {
        let mut item = HostItem::new(1, "9mm").with_unit_weight(0.02);
        assert!((get_float(&item, "UnitSelfWeight") - 0.02).abs() < 1e-7);
        assert!(try_set(&mut item, "_cachedTotalWeight", 5.0f32));
        assert_eq!(get_float(&item, "_cachedTotalWeight"), 5.0);
    }

    #[test]
    fn legacy_schema_differs() {
        let mut item = HostItem::new(7, "old")
            .with_unit_weight(1.0)
            .with_schema(HostSchema::Legacy);
        assert!(get_float(&item, "_cachedTotalWeight").is_nan());
        assert!(!try_set(&mut item, "TotalWeight", 3.0f32));
        assert!(!try_set(&mut item, "TypeID", 9));
        assert!(try_set(&mut item, "typeID", 9));
        assert_eq!(item.type_id(), 9);
        assert!(!try_invoke(&mut item, "RecalculateWeight"));
    }

    #[test]
    fn stats_follow_schema_key_exposure() {
        let mut current = HostItem::new(1, "a").with_stats(&[("Weight", 0.5), ("Damage", 3.0)]);
        assert_eq!(read_weight_stats(&mut current), vec![("Weight".to_string(), 0.5)]);

        let legacy = HostItem::new(1, "b")
            .with_stats(&[("Weight", 0.5)])
            .with_schema(HostSchema::Legacy);
        assert_eq!(weight_keys(legacy.stats().unwrap()), vec!["Weight"]);
    }

    #[test]
    fn slot_predicates() {
        let master = Entity::from_raw(1);
        let mut slot = Slot::new("Ammo1", master);
        slot.require_tags.push(Tag::new("Bullet"));
        slot.exclude_tags.push(Tag::new("Continer"));

        let ammo = HostItem::new(2, "ammo").with_tags(&["bullet"]);
        let boxed = HostItem::new(3, "box").with_tags(&["Bullet", "Continer"]);
        let scrap = HostItem::new(4, "scrap").with_tags(&["Scrap"]);
        assert!(slot.can_plug(&ammo));
        assert!(!slot.can_plug(&boxed));
        assert!(!slot.can_plug(&scrap));

        let item = Entity::from_raw(2);
        assert_eq!(slot.plug(item), None);
        assert_eq!(slot.content(), Some(item));
        assert_eq!(slot.unplug(), Some(item));
        assert_eq!(slot.content(), None);
    }

    #[test]
    fn host_refresh_sums_children() {
        let mut parent = HostItem::new(1, "p").with_unit_weight(1.0);
        parent.refresh_total(2.5);
        assert_eq!(get_float(&parent, "TotalWeight"), 3.5);
        assert_eq!(get_float(&parent, "_cachedTotalWeight"), 3.5);
    }
}
