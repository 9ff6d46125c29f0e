use bevy::prelude::*;

/// 游戏运行的大状态
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    #[default]
    Startup,
    Loading,
    InGame,
    Shutdown,
}

/// 模组启用状态：宿主激活时进入 Active，停用时回到 Inactive
#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum ModState {
    #[default]
    Inactive,
    Active,
}
