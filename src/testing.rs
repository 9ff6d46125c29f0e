//! 测试夹具：无窗口的 App + 内置物品清单

use bevy::asset::ron;
use bevy::prelude::*;
use bevy::state::app::StatesPlugin;

use crate::attribute::accessor::get_float;
use crate::core::CorePlugin;
use crate::core::states::ModState;
use crate::data::host_tables;
use crate::data::schema::ItemList;
use crate::host::HostPlugin;
use crate::host::components::HostItem;
use crate::host::events::{PlugRequest, UnplugRequest};
use crate::host::registry::ItemRegistry;
use crate::weight::WeightPlugin;
use crate::weight::lifecycle::BoxRegistration;

pub fn test_app() -> App {
    let src = include_str!("../assets/data/host.items.ron");
    let list: ItemList = ron::de::from_str(src).unwrap();
    let (registry, merchants) = host_tables(&list);

    let mut app = App::new();
    app.add_plugins((MinimalPlugins, StatesPlugin))
        .add_plugins((CorePlugin, HostPlugin, WeightPlugin))
        .insert_resource(registry)
        .insert_resource(merchants);
    app.update();
    app
}

/// 激活模组并返回弹药盒实体
pub fn activate(app: &mut App) -> Entity {
    app.world_mut()
        .resource_mut::<NextState<ModState>>()
        .set(ModState::Active);
    app.update();
    app.world()
        .resource::<BoxRegistration>()
        .composite
        .expect("box was not created")
}

pub fn deactivate(app: &mut App) {
    app.world_mut()
        .resource_mut::<NextState<ModState>>()
        .set(ModState::Inactive);
    app.update();
}

/// 按模板直接生成一堆物品
pub fn spawn(app: &mut App, template: i32, count: u32) -> Entity {
    let mut item = app
        .world()
        .resource::<ItemRegistry>()
        .duplicate(template)
        .unwrap();
    item.stack_count = count;
    item.restack();
    app.world_mut().spawn(item).id()
}

pub fn plug(app: &mut App, slot: Entity, item: Entity, force: bool) {
    app.world_mut().send_event(PlugRequest { slot, item, force });
    app.update();
}

pub fn unplug(app: &mut App, slot: Entity) {
    app.world_mut().send_event(UnplugRequest { slot });
    app.update();
}

pub fn weight(app: &App, entity: Entity, name: &str) -> f32 {
    get_float(app.world().get::<HostItem>(entity).unwrap(), name)
}

pub fn slots(app: &App) -> Vec<Entity> {
    app.world().resource::<BoxRegistration>().slots.clone()
}
