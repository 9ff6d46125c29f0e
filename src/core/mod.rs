use bevy::prelude::*;

pub mod error;
pub mod events;
pub mod states;

/// 核心插件：注册全局状态 / 事件
pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn build(&self, app: &mut App) {
        use states::{AppState, ModState};

        app.init_state::<AppState>()
            .init_state::<ModState>()
            .add_event::<events::LogEvent>()
            // 宿主进入游戏即激活模组
            .add_systems(OnEnter(AppState::InGame), activate_mod);
    }
}

fn activate_mod(mut next: ResMut<NextState<states::ModState>>) {
    next.set(states::ModState::Active);
}
