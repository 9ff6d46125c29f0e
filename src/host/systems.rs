use bevy::prelude::*;
use std::collections::HashSet;

use super::{components::*, events::*, registry::ItemRegistry};

/// 处理放入 / 取出请求，并广播槽位变化
pub fn apply_slot_requests(
    mut ev_plug: EventReader<PlugRequest>,
    mut ev_unplug: EventReader<UnplugRequest>,
    mut changed: EventWriter<SlotContentChanged>,
    mut slots: Query<(Entity, &mut Slot)>,
    items: Query<&HostItem>,
) {
    for ev in ev_unplug.read() {
        let Ok((_, mut slot)) = slots.get_mut(ev.slot) else {
            warn!("不存在槽位 {:?}", ev.slot);
            continue;
        };
        if slot.unplug().is_some() {
            changed.write(SlotContentChanged { slot: ev.slot });
        }
    }

    for ev in ev_plug.read() {
        let Ok(item) = items.get(ev.item) else {
            warn!("不存在物品 {:?}", ev.item);
            continue;
        };
        let Ok((_, slot)) = slots.get(ev.slot) else {
            warn!("不存在槽位 {:?}", ev.slot);
            continue;
        };
        if !ev.force && !slot.can_plug(item) {
            warn!("{} 不能放入 {}", item.display_name, slot.key);
            continue;
        }

        // 同一物品只能在一个槽位里
        let holder = slots
            .iter()
            .find(|(e, s)| *e != ev.slot && s.content() == Some(ev.item))
            .map(|(e, _)| e);
        if let Some(holder) = holder {
            if let Ok((_, mut old)) = slots.get_mut(holder) {
                old.unplug();
                changed.write(SlotContentChanged { slot: holder });
            }
        }

        if let Ok((_, mut slot)) = slots.get_mut(ev.slot) {
            slot.plug(ev.item);
            changed.write(SlotContentChanged { slot: ev.slot });
        }
    }
}

/// 宿主自己的重量汇总：容器总重 = 自重 + 子物品总重。
/// 会覆盖掉模组钉住的固定重量。
pub fn recompute_container_weights(
    mut changed: EventReader<SlotContentChanged>,
    slots: Query<&Slot>,
    collections: Query<&SlotCollection>,
    mut items: Query<&mut HostItem>,
) {
    let masters: HashSet<Entity> = changed
        .read()
        .filter_map(|ev| slots.get(ev.slot).ok())
        .map(|slot| slot.master)
        .collect();

    for master in masters {
        let Ok(collection) = collections.get(master) else {
            continue;
        };
        let children: f32 = collection
            .slots
            .iter()
            .filter_map(|e| slots.get(*e).ok()?.content())
            .filter_map(|item| items.get(item).ok())
            .map(|item| item.host_total_weight())
            .sum();

        if let Ok(mut item) = items.get_mut(master) {
            item.refresh_total(children);
        }
    }
}

/// 按模板生成散落物品
pub fn spawn_items(
    mut commands: Commands,
    mut ev_spawn: EventReader<SpawnItemRequest>,
    registry: Res<ItemRegistry>,
) {
    for ev in ev_spawn.read() {
        match registry.duplicate(ev.template) {
            Ok(mut item) => {
                item.stack_count = ev.count.max(1);
                item.restack();
                info!("生成 {} ×{}", item.display_name, item.stack_count);
                commands.spawn(item);
            }
            Err(err) => warn!("{err}"),
        }
    }
}
