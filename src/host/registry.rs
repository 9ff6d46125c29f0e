//! 宿主的物品模板注册表与商人库存表

use bevy::prelude::*;
use std::collections::HashMap;

use super::components::HostItem;
use crate::core::error::BoxError;

/// 物品模板 + 运行期动态注册的物品
#[derive(Resource, Default)]
pub struct ItemRegistry {
    templates: HashMap<i32, HostItem>,
    dynamic: HashMap<i32, Entity>,
}

impl ItemRegistry {
    pub fn insert_template(&mut self, item: HostItem) {
        self.templates.insert(item.type_id(), item);
    }

    pub fn template(&self, type_id: i32) -> Option<&HostItem> {
        self.templates.get(&type_id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &HostItem> {
        self.templates.values()
    }

    /// 复制模板得到一个新实例
    pub fn duplicate(&self, source_id: i32) -> Result<HostItem, BoxError> {
        self.templates
            .get(&source_id)
            .cloned()
            .ok_or(BoxError::TemplateCopyFailure(source_id))
    }

    /// 登记动态物品；与模板或已有动态物品撞 ID 时拒绝
    pub fn add_dynamic_entry(&mut self, type_id: i32, entity: Entity) -> bool {
        if self.templates.contains_key(&type_id) || self.dynamic.contains_key(&type_id) {
            return false;
        }
        self.dynamic.insert(type_id, entity);
        true
    }

    pub fn remove_dynamic_entry(&mut self, type_id: i32) -> Option<Entity> {
        self.dynamic.remove(&type_id)
    }

    pub fn dynamic_entry(&self, type_id: i32) -> Option<Entity> {
        self.dynamic.get(&type_id).copied()
    }
}

/// 商人的一条库存记录
#[derive(Clone, Debug, PartialEq)]
pub struct StockEntry {
    pub type_id: i32,
    pub max_stock: i32,
    pub possibility: f32,
    pub price_factor: f32,
    pub force_unlock: bool,
}

impl StockEntry {
    pub fn new(type_id: i32) -> Self {
        Self {
            type_id,
            max_stock: 1,
            possibility: 1.0,
            price_factor: 1.0,
            force_unlock: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MerchantProfile {
    pub entries: Vec<StockEntry>,
}

#[derive(Resource, Default)]
pub struct MerchantDatabase {
    profiles: HashMap<String, MerchantProfile>,
}

impl MerchantDatabase {
    pub fn insert_profile(&mut self, id: impl Into<String>, profile: MerchantProfile) {
        self.profiles.insert(id.into(), profile);
    }

    pub fn profile(&self, id: &str) -> Option<&MerchantProfile> {
        self.profiles.get(id)
    }

    pub fn profile_mut(&mut self, id: &str) -> Option<&mut MerchantProfile> {
        self.profiles.get_mut(id)
    }
}
