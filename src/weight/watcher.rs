//! 槽位成员变化：弹药放入即减重，取出即还原，非弹药直接退回。

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use super::engine::{
    apply_reduced_weight, dump_weights, enforce_fixed_aggregate_weight, restore_weight,
};
use super::snapshot::SnapshotCache;
use crate::data::schema::ModSettings;
use crate::host::components::{HostItem, Slot, Tag};
use crate::host::events::SlotContentChanged;

/// 单个槽位在模组视角下的状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Empty,
    Occupied { item: Entity, accepted: bool },
}

#[derive(Resource, Default, Debug)]
pub struct SlotOccupants {
    states: HashMap<Entity, SlotState>,
}

impl SlotOccupants {
    pub fn state(&self, slot: Entity) -> SlotState {
        self.states.get(&slot).copied().unwrap_or_default()
    }

    pub fn record(&mut self, slot: Entity, item: Entity, accepted: bool) {
        self.states
            .insert(slot, SlotState::Occupied { item, accepted });
    }

    pub fn clear_slot(&mut self, slot: Entity) {
        self.states.remove(&slot);
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// 本会话订阅了变化通知的槽位
#[derive(Resource, Default, Debug)]
pub struct SlotSubscriptions(HashSet<Entity>);

impl SlotSubscriptions {
    pub fn subscribe(&mut self, slot: Entity) -> bool {
        self.0.insert(slot)
    }

    pub fn contains(&self, slot: Entity) -> bool {
        self.0.contains(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.0.iter().copied()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 任一标签名包含任一提示词（都不区分大小写）即视为弹药
pub fn is_accepted(tags: &[Tag], hints: &[String]) -> bool {
    let hints: Vec<String> = hints
        .iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect();
    tags.iter().any(|tag| {
        let name = tag.name().to_lowercase();
        hints.iter().any(|hint| name.contains(hint.as_str()))
    })
}

fn tag_list(item: &HostItem) -> String {
    let names: Vec<&str> = item.tags.iter().map(Tag::name).collect();
    format!("[{}]", names.join(", "))
}

pub fn handle_slot_content_changed(
    mut events: EventReader<SlotContentChanged>,
    settings: Res<ModSettings>,
    subscriptions: Res<SlotSubscriptions>,
    mut occupants: ResMut<SlotOccupants>,
    mut cache: ResMut<SnapshotCache>,
    mut slots: Query<&mut Slot>,
    mut items: Query<&mut HostItem>,
) {
    for ev in events.read() {
        if !subscriptions.contains(ev.slot) {
            continue;
        }
        let Ok(slot) = slots.get(ev.slot) else {
            continue;
        };
        let master = slot.master;
        let content = slot.content();

        if let SlotState::Occupied { item: previous, .. } = occupants.state(ev.slot) {
            // 物品可能只是换到了另一个订阅槽位，那边会接着处理
            let moved = subscriptions
                .iter()
                .filter(|s| *s != ev.slot)
                .any(|s| slots.get(s).is_ok_and(|s| s.content() == Some(previous)));
            if Some(previous) != content && !moved {
                restore(&settings, &mut cache, &mut items, previous);
            }
        }

        match content {
            None => occupants.clear_slot(ev.slot),
            Some(entity) => match (items.get_mut(entity), slots.get_mut(ev.slot)) {
                (Ok(mut item), Ok(mut slot)) => {
                    admit(
                        &settings,
                        &mut cache,
                        &mut occupants,
                        (ev.slot, &mut *slot),
                        (entity, &mut *item),
                    );
                }
                _ => occupants.clear_slot(ev.slot),
            },
        }

        match items.get_mut(master) {
            Ok(mut composite) => {
                enforce_fixed_aggregate_weight(&mut *composite, settings.fixed_total_weight)
            }
            Err(_) => warn!("[AmmoBox] 槽位 {:?} 的容器已不存在", ev.slot),
        }
    }
}

/// 判定槽位里的物品：弹药减重并记为占用，否则还原并退回。返回是否接收
pub(crate) fn admit(
    settings: &ModSettings,
    cache: &mut SnapshotCache,
    occupants: &mut SlotOccupants,
    (slot_entity, slot): (Entity, &mut Slot),
    (entity, item): (Entity, &mut HostItem),
) -> bool {
    let accepted = if settings.allow_any_item {
        info!("[AmmoBox] 放入 {} 标签 {}", item.display_name, tag_list(item));
        true
    } else {
        is_accepted(&item.tags, &settings.tag_hints)
    };

    if accepted {
        let name = item.display_name.clone();
        if settings.weight_dump {
            dump_weights(item, &name, "before-apply", cache.get(entity));
        }
        apply_reduced_weight(cache, entity, item, settings.weight_reduction_percent);
        if settings.weight_dump {
            dump_weights(item, &name, "after-apply", cache.get(entity));
        }
        occupants.record(slot_entity, entity, true);
    } else {
        warn!("[AmmoBox] {} 不是弹药，已退回", item.display_name);
        restore_weight(cache, entity, item);
        slot.unplug();
        occupants.clear_slot(slot_entity);
    }
    accepted
}

fn restore(
    settings: &ModSettings,
    cache: &mut SnapshotCache,
    items: &mut Query<&mut HostItem>,
    entity: Entity,
) {
    let Ok(mut item) = items.get_mut(entity) else {
        // 物品已销毁，快照也没有意义了
        cache.consume(entity);
        return;
    };
    let name = item.display_name.clone();
    let snapshot = cache.get(entity).cloned();
    if restore_weight(cache, entity, &mut *item) && settings.weight_dump {
        dump_weights(&mut *item, &name, "after-restore", snapshot.as_ref());
    }
}

/// 记录所有槽位变化及新物品的标签
pub fn log_slot_changes(
    mut events: EventReader<SlotContentChanged>,
    subscriptions: Res<SlotSubscriptions>,
    slots: Query<&Slot>,
    items: Query<&HostItem>,
) {
    for ev in events.read() {
        if !subscriptions.contains(ev.slot) {
            continue;
        }
        let Ok(slot) = slots.get(ev.slot) else {
            continue;
        };
        match slot.content().and_then(|e| items.get(e).ok()) {
            Some(item) => info!(
                "[SlotChange] {} <- {} {}",
                slot.key,
                item.display_name,
                tag_list(item)
            ),
            None => info!("[SlotChange] {} <- (empty)", slot.key),
        }
    }
}
