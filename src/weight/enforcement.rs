//! 周期性把容器总重钉回固定值。宿主的重算随时可能把它改掉。

use bevy::prelude::*;
use std::time::Duration;

use super::engine::enforce_fixed_aggregate_weight;
use super::lifecycle::BoxRegistration;
use crate::data::schema::ModSettings;
use crate::host::components::HostItem;

#[derive(Resource, Debug)]
pub struct EnforcementLoop {
    timer: Timer,
    active: bool,
}

impl Default for EnforcementLoop {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(0.5, TimerMode::Repeating),
            active: false,
        }
    }
}

impl EnforcementLoop {
    pub fn start(&mut self, period_secs: f32) {
        self.timer = Timer::from_seconds(period_secs, TimerMode::Repeating);
        self.active = true;
    }

    /// 停止后不再重新计时
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 本次推进是否到期；一次推进跨过多个周期也只算一次
    pub fn tick(&mut self, delta: Duration) -> bool {
        self.active && self.timer.tick(delta).just_finished()
    }
}

pub fn run_enforcement_loop(
    time: Res<Time>,
    settings: Res<ModSettings>,
    registration: Res<BoxRegistration>,
    mut enforcement: ResMut<EnforcementLoop>,
    mut items: Query<&mut HostItem>,
) {
    if !enforcement.tick(time.delta()) {
        return;
    }
    let Some(composite) = registration.composite else {
        return;
    };
    match items.get_mut(composite) {
        Ok(mut item) => enforce_fixed_aggregate_weight(&mut *item, settings.fixed_total_weight),
        Err(_) => debug!("[AmmoBox] 容器 {composite:?} 不存在，跳过"),
    }
}
