//! 宿主游戏一侧的对象模型与服务（模板注册、商人、图标、文本）。
//! 模组核心只通过这些接口与宿主交互。
pub mod components;
pub mod events;
pub mod icons;
pub mod localization;
pub mod registry;
mod systems;

use bevy::asset::AssetLoadFailedEvent;
use bevy::prelude::*;
use events::*;
use systems::*;

/// 宿主侧系统顺序：先处理槽位请求，再做宿主自己的重量汇总
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostSet {
    Slots,
    Recompute,
}

pub struct HostPlugin;
impl Plugin for HostPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<registry::ItemRegistry>()
            .init_resource::<registry::MerchantDatabase>()
            .init_resource::<icons::IconCache>()
            .init_resource::<localization::TextOverrides>()
            .add_event::<SlotContentChanged>()
            .add_event::<PlugRequest>()
            .add_event::<UnplugRequest>()
            .add_event::<SpawnItemRequest>()
            // 无 AssetPlugin 时也能运行
            .add_event::<AssetLoadFailedEvent<Image>>()
            .configure_sets(Update, (HostSet::Slots, HostSet::Recompute).chain())
            .add_systems(Startup, localization::apply_system_language)
            .add_systems(
                Update,
                (
                    (spawn_items, apply_slot_requests)
                        .chain()
                        .in_set(HostSet::Slots),
                    recompute_container_weights.in_set(HostSet::Recompute),
                    icons::report_icon_failures,
                ),
            );
    }
}
