use bevy::prelude::*;

/// 面向终端的输出行
#[derive(Event)]
pub struct LogEvent(pub String);
