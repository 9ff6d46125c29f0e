//! 弹药盒核心：快照、减重、槽位监听、固定总重与会话生命周期。
pub mod enforcement;
pub mod engine;
pub mod lifecycle;
pub mod snapshot;
pub mod watcher;

use bevy::prelude::*;

use crate::core::states::ModState;
use crate::data::schema::ModSettings;
use crate::host::HostSet;

/// 模组系统顺序：必须排在宿主重算之后，否则固定总重会被覆盖
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoxSet {
    Watch,
    Enforce,
}

pub struct WeightPlugin;
impl Plugin for WeightPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModSettings>()
            .init_resource::<snapshot::SnapshotCache>()
            .init_resource::<watcher::SlotOccupants>()
            .init_resource::<watcher::SlotSubscriptions>()
            .init_resource::<enforcement::EnforcementLoop>()
            .init_resource::<lifecycle::BoxRegistration>()
            .configure_sets(
                Update,
                (
                    BoxSet::Watch.after(HostSet::Recompute),
                    BoxSet::Enforce.after(BoxSet::Watch),
                ),
            )
            .add_systems(OnEnter(ModState::Active), lifecycle::start_session)
            .add_systems(OnExit(ModState::Active), lifecycle::stop_session)
            .add_systems(
                Update,
                (
                    (watcher::handle_slot_content_changed, watcher::log_slot_changes)
                        .chain()
                        .in_set(BoxSet::Watch),
                    enforcement::run_enforcement_loop.in_set(BoxSet::Enforce),
                )
                    .run_if(in_state(ModState::Active)),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::snapshot::SnapshotCache;
    use super::watcher::{SlotOccupants, SlotState};
    use crate::host::components::{HostItem, Slot};
    use crate::testing::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn ammo_is_reduced_and_box_stays_fixed() {
        let mut app = test_app();
        let composite = activate(&mut app);
        let slots = slots(&app);
        let ammo = spawn(&mut app, 594, 30);
        let before = weight(&app, ammo, "weight");

        plug(&mut app, slots[0], ammo, false);

        assert!((weight(&app, ammo, "weight") - before * 0.2).abs() < EPS);
        assert!((weight(&app, ammo, "TotalWeight") - before * 0.2).abs() < EPS);
        for field in ["weight", "SelfWeight", "TotalWeight", "_cachedTotalWeight"] {
            assert_eq!(weight(&app, composite, field), 1.0, "{field}");
        }
        let stats = app.world().get::<HostItem>(composite).unwrap().stats().unwrap();
        assert_eq!(stats.value("Weight"), Some(1.0));
        assert_eq!(
            app.world().resource::<SlotOccupants>().state(slots[0]),
            SlotState::Occupied {
                item: ammo,
                accepted: true
            }
        );
    }

    #[test]
    fn box_weight_ignores_how_much_is_inside() {
        let mut app = test_app();
        let composite = activate(&mut app);
        let slots = slots(&app);
        for (i, template) in [594, 603, 611, 594].into_iter().enumerate() {
            let item = spawn(&mut app, template, 30);
            plug(&mut app, slots[i], item, false);
            assert_eq!(weight(&app, composite, "TotalWeight"), 1.0);
        }
        assert_eq!(app.world().resource::<SnapshotCache>().len(), 4);
    }

    #[test]
    fn non_ammo_is_rejected_untouched() {
        let mut app = test_app();
        let composite = activate(&mut app);
        let slots = slots(&app);
        let scrap = spawn(&mut app, 1201, 1);
        let before = weight(&app, scrap, "weight");

        // 绕过宿主的标签检查，只剩模组这一道
        plug(&mut app, slots[0], scrap, true);

        let world = app.world();
        assert_eq!(world.get::<Slot>(slots[0]).unwrap().content(), None);
        assert_eq!(weight(&app, scrap, "weight"), before);
        assert!(world.resource::<SnapshotCache>().is_empty());
        assert_eq!(world.resource::<SlotOccupants>().state(slots[0]), SlotState::Empty);
        assert_eq!(weight(&app, composite, "TotalWeight"), 1.0);
    }

    #[test]
    fn host_refuses_non_ammo_without_force() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        let scrap = spawn(&mut app, 1201, 1);
        plug(&mut app, slots[0], scrap, false);
        assert_eq!(app.world().get::<Slot>(slots[0]).unwrap().content(), None);
    }

    #[test]
    fn allow_any_item_accepts_everything() {
        let mut app = test_app();
        app.insert_resource(crate::data::schema::ModSettings {
            allow_any_item: true,
            ..Default::default()
        });
        activate(&mut app);
        let slots = slots(&app);
        let scrap = spawn(&mut app, 1201, 1);
        let before = weight(&app, scrap, "weight");

        plug(&mut app, slots[0], scrap, false);

        assert_eq!(
            app.world().get::<Slot>(slots[0]).unwrap().content(),
            Some(scrap)
        );
        assert!((weight(&app, scrap, "weight") - before * 0.2).abs() < EPS);
    }

    #[test]
    fn removal_restores_original_weight() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        let ammo = spawn(&mut app, 594, 30);
        let before = weight(&app, ammo, "weight");

        plug(&mut app, slots[0], ammo, false);
        unplug(&mut app, slots[0]);

        assert_eq!(weight(&app, ammo, "weight"), before);
        assert_eq!(weight(&app, ammo, "SelfWeight"), before);
        assert!(app.world().resource::<SnapshotCache>().is_empty());
        assert!(app.world().resource::<SlotOccupants>().is_empty());
    }

    #[test]
    fn swapping_restores_the_previous_occupant() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        let first = spawn(&mut app, 594, 30);
        let second = spawn(&mut app, 603, 10);
        let first_before = weight(&app, first, "weight");

        plug(&mut app, slots[0], first, false);
        plug(&mut app, slots[0], second, false);

        assert_eq!(weight(&app, first, "weight"), first_before);
        let cache = app.world().resource::<SnapshotCache>();
        assert!(!cache.contains(first));
        assert!(cache.contains(second));
    }

    #[test]
    fn rejected_replacement_restores_and_evicts_both() {
        let mut app = test_app();
        let composite = activate(&mut app);
        let slots = slots(&app);
        let ammo = spawn(&mut app, 594, 30);
        let scrap = spawn(&mut app, 1201, 1);
        let ammo_before = weight(&app, ammo, "weight");
        let scrap_before = weight(&app, scrap, "weight");

        plug(&mut app, slots[0], ammo, false);
        assert!(weight(&app, ammo, "weight") < ammo_before);
        plug(&mut app, slots[0], scrap, true);

        let world = app.world();
        assert_eq!(weight(&app, ammo, "weight"), ammo_before);
        assert_eq!(weight(&app, scrap, "weight"), scrap_before);
        assert_eq!(world.get::<Slot>(slots[0]).unwrap().content(), None);
        assert_eq!(world.resource::<SlotOccupants>().state(slots[0]), SlotState::Empty);
        assert!(world.resource::<SnapshotCache>().is_empty());
        assert_eq!(weight(&app, composite, "TotalWeight"), 1.0);
    }

    #[test]
    fn moving_between_slots_keeps_a_single_reduction() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        let ammo = spawn(&mut app, 594, 30);
        let before = weight(&app, ammo, "weight");

        plug(&mut app, slots[0], ammo, false);
        plug(&mut app, slots[5], ammo, false);

        assert!((weight(&app, ammo, "weight") - before * 0.2).abs() < EPS);
        let world = app.world();
        assert_eq!(world.resource::<SnapshotCache>().len(), 1);
        let occupants = world.resource::<SlotOccupants>();
        assert_eq!(occupants.state(slots[0]), SlotState::Empty);
        assert_eq!(
            occupants.state(slots[5]),
            SlotState::Occupied {
                item: ammo,
                accepted: true
            }
        );

        unplug(&mut app, slots[5]);
        assert_eq!(weight(&app, ammo, "weight"), before);
    }

    #[test]
    fn locked_stat_does_not_block_the_rest() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        let ammo = spawn(&mut app, 603, 30);
        plug(&mut app, slots[0], ammo, false);

        let item = app.world().get::<HostItem>(ammo).unwrap();
        let stats = item.stats().unwrap();
        assert!((stats.value("Weight").unwrap() - 0.004).abs() < EPS);
        assert_eq!(stats.value("WeightPerRound"), Some(0.02));
    }

    #[test]
    fn inactive_mod_ignores_slot_traffic() {
        let mut app = test_app();
        activate(&mut app);
        let slots = slots(&app);
        deactivate(&mut app);

        let ammo = spawn(&mut app, 594, 30);
        let before = weight(&app, ammo, "weight");
        // 槽位已随弹药盒销毁，请求被宿主丢弃
        plug(&mut app, slots[0], ammo, false);
        assert_eq!(weight(&app, ammo, "weight"), before);
    }
}
