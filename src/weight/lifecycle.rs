//! 会话生命周期：激活时造出弹药盒并挂上所有钩子，停用时原样拆掉。

use bevy::prelude::*;

use super::enforcement::EnforcementLoop;
use super::engine::{enforce_fixed_aggregate_weight, restore_from};
use super::snapshot::SnapshotCache;
use super::watcher::{SlotOccupants, SlotSubscriptions, admit};
use crate::attribute::accessor::{try_set, try_set_first};
use crate::core::error::BoxError;
use crate::data::schema::ModSettings;
use crate::host::components::{HostItem, Slot, SlotCollection, Tag};
use crate::host::icons::{IconCache, asset_root};
use crate::host::registry::{ItemRegistry, MerchantDatabase, StockEntry};

const TYPE_ID_CANDIDATES: [&str; 3] = ["TypeID", "typeID", "_typeID"];

/// 弹药盒实体的标记
#[derive(Component, Debug)]
pub struct AmmoBox;

/// 本会话的弹药盒
#[derive(Resource, Default, Debug)]
pub struct BoxRegistration {
    pub composite: Option<Entity>,
    pub slots: Vec<Entity>,
    /// 由本会话创建（而不是复用已注册的实例），停用时需要移除
    pub created_this_session: bool,
}

/// 把复制来的模板改造成弹药盒
fn configure_composite(item: &mut HostItem, settings: &ModSettings, icon: Option<Handle<Image>>) {
    try_set(item, "DisplayNameRaw", settings.name_key.as_str());
    try_set(item, "DescriptionRaw", settings.description_key.as_str());
    try_set(item, "FromInfoKey", true);
    try_set(item, "NeedInspection", false);
    try_set(item, "Inspected", true);
    try_set(item, "Value", settings.value);
    item.tags = to_tags(&settings.box_tags);
    if icon.is_some() {
        item.icon = icon;
    }
    enforce_fixed_aggregate_weight(item, settings.fixed_total_weight);
}

fn to_tags(names: &[String]) -> Vec<Tag> {
    names.iter().map(Tag::new).collect()
}

fn build_slots(settings: &ModSettings, master: Entity) -> Vec<Slot> {
    (1..=settings.slot_count)
        .map(|i| {
            let mut slot = Slot::new(format!("{}{i}", settings.slot_prefix), master);
            if !settings.allow_any_item {
                slot.require_tags = to_tags(&settings.require_tags);
                slot.exclude_tags = to_tags(&settings.exclude_tags);
            }
            slot
        })
        .collect()
}

fn create_composite(
    commands: &mut Commands,
    registry: &mut ItemRegistry,
    settings: &ModSettings,
    icon: Option<Handle<Image>>,
) -> Result<Entity, BoxError> {
    let mut item = registry.duplicate(settings.template_id)?;
    if !try_set_first(&mut item, &TYPE_ID_CANDIDATES, settings.box_type_id) {
        warn!("[AmmoBox] 无法写入 TypeID，沿用模板的 {}", item.type_id());
    }
    configure_composite(&mut item, settings, icon);

    let entity = commands.spawn((item, AmmoBox)).id();
    if !registry.add_dynamic_entry(settings.box_type_id, entity) {
        commands.entity(entity).despawn();
        return Err(BoxError::RegistrationFailure(settings.box_type_id));
    }
    Ok(entity)
}

#[allow(clippy::too_many_arguments)]
pub fn start_session(
    mut commands: Commands,
    settings: Res<ModSettings>,
    asset_server: Option<Res<AssetServer>>,
    mut registry: ResMut<ItemRegistry>,
    mut merchants: ResMut<MerchantDatabase>,
    mut icons: ResMut<IconCache>,
    mut subscriptions: ResMut<SlotSubscriptions>,
    mut registration: ResMut<BoxRegistration>,
    mut enforcement: ResMut<EnforcementLoop>,
    mut cache: ResMut<SnapshotCache>,
    mut occupants: ResMut<SlotOccupants>,
    mut items: Query<(&mut HostItem, Option<&SlotCollection>)>,
    mut slot_query: Query<&mut Slot>,
) {
    let icon = match icons.load(asset_server.as_deref(), &asset_root(), &settings.icon) {
        Ok(handle) => Some(handle),
        Err(err) => {
            warn!("[AmmoBox] 图标不可用: {err}");
            None
        }
    };

    // 已经注册过就复用
    let existing = registry
        .dynamic_entry(settings.box_type_id)
        .filter(|e| items.contains(*e));
    let (composite, created, slots) = match existing {
        Some(entity) => {
            let Ok((mut item, collection)) = items.get_mut(entity) else {
                return;
            };
            configure_composite(&mut item, &settings, icon);
            let slots = collection.map(|c| c.slots.clone()).unwrap_or_default();
            (entity, false, slots)
        }
        None => match create_composite(&mut commands, &mut registry, &settings, icon) {
            Ok(entity) => (entity, true, Vec::new()),
            Err(err) if err.aborts_session() => {
                error!("[AmmoBox] 会话中止，不再重试: {err}");
                return;
            }
            Err(err) => {
                warn!("[AmmoBox] 会话启动失败: {err}");
                return;
            }
        },
    };

    let slots = if slots.is_empty() {
        let spawned: Vec<Entity> = build_slots(&settings, composite)
            .into_iter()
            .map(|slot| commands.spawn((slot, ChildOf(composite))).id())
            .collect();
        commands.entity(composite).insert(SlotCollection {
            slots: spawned.clone(),
        });
        spawned
    } else {
        slots
    };
    for slot in &slots {
        subscriptions.subscribe(*slot);
    }

    // 复用的槽位里可能还留着上次会话的物品，按放入时的规则重新判定
    let mut readmitted = 0;
    for &slot_entity in &slots {
        let Ok(mut slot) = slot_query.get_mut(slot_entity) else {
            continue;
        };
        let Some(content) = slot.content() else {
            continue;
        };
        if let Ok((mut item, _)) = items.get_mut(content) {
            admit(
                &settings,
                &mut cache,
                &mut occupants,
                (slot_entity, &mut *slot),
                (content, &mut *item),
            );
            readmitted += 1;
        }
    }
    if readmitted > 0 {
        if let Ok((mut item, _)) = items.get_mut(composite) {
            enforce_fixed_aggregate_weight(&mut *item, settings.fixed_total_weight);
        }
    }

    match merchants.profile_mut(&settings.merchant_profile) {
        Some(profile) => {
            if !profile
                .entries
                .iter()
                .any(|e| e.type_id == settings.box_type_id)
            {
                profile.entries.push(StockEntry {
                    force_unlock: true,
                    ..StockEntry::new(settings.box_type_id)
                });
            }
        }
        None => warn!("[AmmoBox] 找不到商人 {}", settings.merchant_profile),
    }

    enforcement.start(settings.enforce_period_secs);
    info!(
        "[AmmoBox] 会话开始：{:?}，{} 个槽位，放入后保留 {:.0}% 重量",
        composite,
        slots.len(),
        settings.multiplier() * 100.0
    );

    *registration = BoxRegistration {
        composite: Some(composite),
        slots,
        created_this_session: created,
    };
}

#[allow(clippy::too_many_arguments)]
pub fn stop_session(
    mut commands: Commands,
    settings: Res<ModSettings>,
    mut registry: ResMut<ItemRegistry>,
    mut merchants: ResMut<MerchantDatabase>,
    mut cache: ResMut<SnapshotCache>,
    mut occupants: ResMut<SlotOccupants>,
    mut subscriptions: ResMut<SlotSubscriptions>,
    mut registration: ResMut<BoxRegistration>,
    mut enforcement: ResMut<EnforcementLoop>,
    mut items: Query<&mut HostItem>,
) {
    enforcement.stop();

    let mut restored = 0;
    for (entity, snapshot) in cache.drain_all() {
        if let Ok(mut item) = items.get_mut(entity) {
            restore_from(&mut *item, &snapshot);
            restored += 1;
        }
    }
    occupants.clear();
    subscriptions.clear();

    if let Some(profile) = merchants.profile_mut(&settings.merchant_profile) {
        profile
            .entries
            .retain(|e| e.type_id != settings.box_type_id);
    }

    let registration = std::mem::take(&mut *registration);
    if let (Some(composite), true) = (registration.composite, registration.created_this_session) {
        registry.remove_dynamic_entry(settings.box_type_id);
        // 槽位是子实体，一并销毁
        commands.entity(composite).despawn();
    }
    info!("[AmmoBox] 会话结束，还原 {restored} 个物品");
}
