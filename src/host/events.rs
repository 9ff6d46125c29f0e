use bevy::prelude::*;

/// 槽位内容发生变化（放入、取出、替换）
#[derive(Event, Clone, Copy, Debug)]
pub struct SlotContentChanged {
    pub slot: Entity,
}

/// 请求把物品放进槽位；`force` 跳过宿主的标签检查
#[derive(Event)]
pub struct PlugRequest {
    pub slot: Entity,
    pub item: Entity,
    pub force: bool,
}

#[derive(Event)]
pub struct UnplugRequest {
    pub slot: Entity,
}

/// 按模板生成一个散落物品
#[derive(Event)]
pub struct SpawnItemRequest {
    pub template: i32,
    pub count: u32,
}
