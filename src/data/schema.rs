use bevy::asset::Asset;
use bevy::prelude::Resource;
use bevy::reflect::TypePath;
use serde::Deserialize;

use crate::host::components::{HostItem, HostSchema};

/// 宿主物品模板
#[derive(Debug, Deserialize, Clone)]
pub struct ItemEntry {
    pub id:   i32,
    pub name: String,
    #[serde(default)] pub tags:   Vec<String>,
    #[serde(default)] pub weight: f32,
    #[serde(default = "one")] pub stack: u32,
    #[serde(default)] pub value:  i32,
    #[serde(default)] pub stats:  Vec<(String, f32)>,
    #[serde(default)] pub locked_stats: Vec<String>,
    #[serde(default)] pub schema: HostSchema,
}

fn one() -> u32 {
    1
}

impl ItemEntry {
    pub fn to_host_item(&self) -> HostItem {
        let tags: Vec<&str> = self.tags.iter().map(String::as_str).collect();
        let stats: Vec<(&str, f32)> = self.stats.iter().map(|(k, v)| (k.as_str(), *v)).collect();

        let mut item = HostItem::new(self.id, self.name.clone())
            .with_schema(self.schema)
            .with_tags(&tags)
            .with_value(self.value);
        item.stack_count = self.stack.max(1);
        let mut item = item.with_unit_weight(self.weight);
        if !stats.is_empty() {
            item = item.with_stats(&stats);
        }
        for key in &self.locked_stats {
            item = item.with_locked_stat(key);
        }
        item
    }
}

/// 商人初始库存
#[derive(Debug, Deserialize, Clone)]
pub struct MerchantEntry {
    pub id: String,
    #[serde(default)] pub stock: Vec<i32>,
}

#[derive(Asset, TypePath, Deserialize, Debug)]
pub struct ItemList {
    pub items: Vec<ItemEntry>,
    #[serde(default)] pub merchants: Vec<MerchantEntry>,
}

/// 模组配置；缺省值即模组的出厂参数
#[derive(Asset, TypePath, Resource, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ModSettings {
    /// 被复制的模板（注射器收纳盒）
    pub template_id: i32,
    pub box_type_id: i32,
    pub name_key: String,
    pub description_key: String,
    pub value: i32,
    pub slot_count: usize,
    pub slot_prefix: String,
    pub box_tags: Vec<String>,
    pub require_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    /// 标签名包含其中任一子串即视为弹药（不区分大小写）
    pub tag_hints: Vec<String>,
    pub fixed_total_weight: f32,
    pub weight_reduction_percent: f32,
    pub enforce_period_secs: f32,
    pub merchant_profile: String,
    pub icon: String,
    /// 调试：任何物品都接收
    pub allow_any_item: bool,
    /// 调试：放入 / 取出前后打印重量
    pub weight_dump: bool,
}

impl Default for ModSettings {
    fn default() -> Self {
        Self {
            template_id: 882,
            box_type_id: 500882,
            name_key: "Item_BulletBox".into(),
            description_key: "Item_BulletBox_Desc".into(),
            value: 20000,
            slot_count: 12,
            slot_prefix: "Ammo".into(),
            box_tags: vec!["Bullet".into(), "Continer".into()],
            require_tags: vec!["Bullet".into()],
            exclude_tags: vec!["Continer".into()],
            tag_hints: vec!["bullet".into(), "ammo".into()],
            fixed_total_weight: 1.0,
            weight_reduction_percent: 0.8,
            enforce_period_secs: 0.5,
            merchant_profile: "Merchant_Weapon".into(),
            icon: "box.png".into(),
            allow_any_item: false,
            weight_dump: false,
        }
    }
}

impl ModSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.weight_reduction_percent) {
            anyhow::bail!(
                "weight_reduction_percent must be within [0, 1], got {}",
                self.weight_reduction_percent
            );
        }
        if !(self.enforce_period_secs > 0.0) {
            anyhow::bail!("enforce_period_secs must be positive");
        }
        if self.slot_count == 0 {
            anyhow::bail!("slot_count must be at least 1");
        }
        if !self.fixed_total_weight.is_finite() || self.fixed_total_weight < 0.0 {
            anyhow::bail!("fixed_total_weight must be a finite non-negative number");
        }
        Ok(())
    }

    /// 放入后保留的重量比例
    pub fn multiplier(&self) -> f64 {
        1.0 - f64::from(self.weight_reduction_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::accessor::get_float;
    use bevy::asset::ron;

    #[test]
    fn bundled_settings_match_defaults() {
        let src = include_str!("../../assets/data/ammo_box.box.ron");
        let settings: ModSettings = ron::de::from_str(src).unwrap();
        assert_eq!(settings, ModSettings::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let settings: ModSettings = ron::de::from_str("(slot_count: 4, allow_any_item: true)").unwrap();
        assert_eq!(settings.slot_count, 4);
        assert!(settings.allow_any_item);
        assert_eq!(settings.box_type_id, 500882);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = ModSettings::default();
        settings.weight_reduction_percent = 1.5;
        assert!(settings.validate().is_err());
        settings = ModSettings { enforce_period_secs: 0.0, ..Default::default() };
        assert!(settings.validate().is_err());
        settings = ModSettings { slot_count: 0, ..Default::default() };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn bundled_items_build_host_items() {
        let src = include_str!("../../assets/data/host.items.ron");
        let list: ItemList = ron::de::from_str(src).unwrap();
        let case = list.items.iter().find(|e| e.id == 882).unwrap().to_host_item();
        assert_eq!(case.type_id(), 882);
        assert!(case.stats().is_some());
        assert!(list.merchants.iter().any(|m| m.id == "Merchant_Weapon"));

        let ammo = list.items.iter().find(|e| e.stack > 1).unwrap();
        let item = ammo.to_host_item();
        let expected = ammo.weight * ammo.stack as f32;
        assert!((get_float(&item, "weight") - expected).abs() < 1e-4);
    }
}
