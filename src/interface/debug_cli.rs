//! 文字 CLI：读取 stdin → 解析命令 → 执行并打印

use bevy::app::AppExit;
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::num::NonZero;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::attribute::accessor::get_float;
use crate::core::{
    events::LogEvent,
    states::{AppState, ModState},
};
use crate::host::components::{HostItem, Slot};
use crate::host::events::{PlugRequest, SpawnItemRequest, UnplugRequest};
use crate::host::localization::TextOverrides;
use crate::host::registry::ItemRegistry;
use crate::weight::lifecycle::{AmmoBox, BoxRegistration};
use crate::weight::snapshot::{SnapshotCache, WeightField};
use crate::weight::watcher::SlotOccupants;

static CLI_BUFFER: Lazy<Arc<Mutex<VecDeque<String>>>> =
    Lazy::new(|| Arc::new(Mutex::new(VecDeque::new())));

/// 插件入口
pub struct DebugCliPlugin;
impl Plugin for DebugCliPlugin {
    fn build(&self, app: &mut App) {
        {
            let buffer = CLI_BUFFER.clone();
            std::thread::spawn(move || {
                use std::io::{self, BufRead};
                let stdin = io::stdin();
                for line in stdin.lock().lines().map_while(Result::ok) {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if let Ok(mut buf) = buffer.lock() {
                        buf.push_back(line.to_string());
                    }
                }
            });
        }
        app
            // 事件：原始输入行
            .add_event::<CliLine>()
            // 每帧从 buffer 取出所有命令行写入事件
            .add_systems(Update, read_stdin)
            // 仅在 InGame 处理命令
            .add_systems(
                Update,
                execute_cli_commands.run_if(in_state(AppState::InGame)),
            );
    }
}

/* ---------------------------- 事件与枚举 ---------------------------- */

/// 终端敲的一整行
#[derive(Event)]
struct CliLine(String);

/// 我们支持的命令
#[derive(Debug, PartialEq)]
enum Command {
    Help,
    Status,
    Exit,
    Items(Option<String>), // None=全部；Some(token)=按 id/uuid/name 查询
    Spawn { id: i32, count: u32 },
    Ground,
    Plug { slot: usize, item: u32, force: bool },
    Unplug { slot: usize },
    ShowBox,
    Activate,
    Deactivate,
    Unsupported(String),
}

/// 命令会发出的宿主请求
#[derive(SystemParam)]
struct HostRequests<'w> {
    spawn: EventWriter<'w, SpawnItemRequest>,
    plug: EventWriter<'w, PlugRequest>,
    unplug: EventWriter<'w, UnplugRequest>,
}

/* ---------------------------- 读取 stdin ---------------------------- */

fn read_stdin(mut writer: EventWriter<CliLine>) {
    let Ok(mut buffer) = CLI_BUFFER.lock() else {
        return;
    };
    while let Some(line) = buffer.pop_front() {
        writer.write(CliLine(line));
    }
}

/* ---------------------------- 命令执行 ---------------------------- */

#[allow(clippy::too_many_arguments)]
fn execute_cli_commands(
    mut line_reader: EventReader<CliLine>,
    mut app_exit: EventWriter<AppExit>,
    mut log: EventWriter<LogEvent>,
    mut requests: HostRequests,
    state: Res<State<AppState>>,
    mod_state: Res<State<ModState>>,
    mut next_mod: ResMut<NextState<ModState>>,
    registry: Res<ItemRegistry>,
    registration: Res<BoxRegistration>,
    cache: Res<SnapshotCache>,
    occupants: Res<SlotOccupants>,
    texts: Res<TextOverrides>,
    items: Query<(Entity, &HostItem, Has<AmmoBox>)>,
    slots: Query<&Slot>,
) {
    for CliLine(input) in line_reader.read() {
        match parse_command(input) {
            Command::Help => {
                log.write(LogEvent(
                    "命令列表:
  help                      查看帮助
  status                    查看当前状态
  exit / quit               退出程序
  items                     列出所有物品模板
  items <token>             用 id / uuid / 名称 查询单个模板
  spawn <id> [count]        生成散落物品
  ground                    列出散落物品
  plug <slot> <item> [!]    把物品放进第 slot 格（! 跳过宿主检查）
  unplug <slot>             取出第 slot 格
  box                       查看弹药盒
  activate / deactivate     启用 / 停用模组
  ".into()));
            }

            Command::Status => {
                log.write(LogEvent(format!(
                    "State: {:?}, Mod: {:?}, Templates: {}, Box: {:?}, Occupied: {}, Snapshots: {}",
                    state.get(),
                    mod_state.get(),
                    registry.templates().count(),
                    registration.composite,
                    occupants.len(),
                    cache.len()
                )));
            }

            Command::Exit => {
                log.write(LogEvent("Bye~".into()));
                app_exit.write(AppExit::Error(NonZero::<u8>::MIN));
            }

            Command::Items(None) => {
                let mut templates: Vec<&HostItem> = registry.templates().collect();
                templates.sort_by_key(|t| t.type_id());
                for t in templates {
                    log.write(LogEvent(format!(
                        "{} | {} | {}",
                        uuid_from_id(t.type_id()),
                        t.type_id(),
                        texts.text(&t.display_name)
                    )));
                }
            }

            Command::Items(Some(token)) => {
                let found = token
                    .parse()
                    .ok()
                    .and_then(|id| registry.template(id))
                    .or_else(|| {
                        registry.templates().find(|t| {
                            t.display_name.eq_ignore_ascii_case(&token)
                                || uuid_from_id(t.type_id()).to_string() == token.to_lowercase()
                        })
                    });
                match found {
                    Some(t) => {
                        let tags: Vec<&str> = t.tags.iter().map(|t| t.name()).collect();
                        log.write(LogEvent(format!(
                            "==================================================
UUID   : {}
ID     : {}
Name   : {}
Schema : {:?}
Tags   : {}
Weight : {}
==================================================",
                            uuid_from_id(t.type_id()),
                            t.type_id(),
                            texts.text(&t.display_name),
                            t.schema(),
                            tags.join(", "),
                            get_float(t, "weight")
                        )));
                    }
                    None => {
                        log.write(LogEvent("未找到匹配物品".into()));
                    }
                }
            }

            Command::Spawn { id, count } => {
                requests.spawn.write(SpawnItemRequest {
                    template: id,
                    count,
                });
            }

            Command::Ground => {
                let held: Vec<Entity> = slots.iter().filter_map(Slot::content).collect();
                for (entity, item, _) in items.iter().filter(|(e, _, b)| !b && !held.contains(e)) {
                    log.write(LogEvent(format!(
                        "#{} {} ×{} weight={}",
                        entity.index(),
                        texts.text(&item.display_name),
                        item.stack_count,
                        get_float(item, "weight")
                    )));
                }
            }

            Command::Plug { slot, item, force } => {
                let target = items
                    .iter()
                    .find(|(e, _, is_box)| e.index() == item && !is_box)
                    .map(|(e, _, _)| e);
                match (box_slot(&registration, slot), target) {
                    (Some(slot), Some(item)) => {
                        requests.plug.write(PlugRequest { slot, item, force });
                    }
                    (None, _) => {
                        log.write(LogEvent(format!("没有第 {slot} 格")));
                    }
                    (_, None) => {
                        log.write(LogEvent(format!("没有物品 #{item}")));
                    }
                }
            }

            Command::Unplug { slot } => match box_slot(&registration, slot) {
                Some(slot) => {
                    requests.unplug.write(UnplugRequest { slot });
                }
                None => {
                    log.write(LogEvent(format!("没有第 {slot} 格")));
                }
            },

            Command::ShowBox => {
                let Some((_, composite, _)) = registration
                    .composite
                    .and_then(|e| items.get(e).ok())
                else {
                    log.write(LogEvent("弹药盒未创建".into()));
                    continue;
                };
                let fields: Vec<String> = WeightField::ALL
                    .iter()
                    .map(|f| format!("{}={}", f.label(), get_float(composite, f.label())))
                    .collect();
                log.write(LogEvent(format!(
                    "{} | {}",
                    texts.text(&composite.display_name),
                    fields.join(" ")
                )));
                for slot in registration.slots.iter().filter_map(|e| slots.get(*e).ok()) {
                    let content = slot
                        .content()
                        .and_then(|e| items.get(e).ok())
                        .map(|(e, item, _)| {
                            format!(
                                "#{} {} weight={}",
                                e.index(),
                                texts.text(&item.display_name),
                                get_float(item, "weight")
                            )
                        })
                        .unwrap_or_else(|| "-".into());
                    log.write(LogEvent(format!("  {}: {content}", slot.key)));
                }
            }

            Command::Activate => next_mod.set(ModState::Active),

            Command::Deactivate => next_mod.set(ModState::Inactive),

            Command::Unsupported(cmd) => {
                log.write(LogEvent(format!("不支持的命令: {cmd}")));
            }
        }
    }
}

/* ---------------------------- 工具函数 ---------------------------- */

fn parse_command(input: &str) -> Command {
    let mut parts = input.split_whitespace();
    let cmd = parts.next().unwrap_or("").to_lowercase();
    match cmd.as_str() {
        "help" | "h" | "?" => Command::Help,
        "status" | "s" => Command::Status,
        "exit" | "quit" | "q" => Command::Exit,
        "items" | "item" | "i" => {
            let token = parts.next().map(|s| s.to_string());
            Command::Items(token)
        }
        "spawn" => {
            let Some(Ok(id)) = parts.next().map(str::parse) else {
                return Command::Unsupported(input.into());
            };
            let count = parts.next().unwrap_or("1").parse().unwrap_or(1);
            Command::Spawn { id, count }
        }
        "ground" | "g" => Command::Ground,
        "plug" => {
            let slot = parts.next().and_then(|s| s.parse().ok());
            let item = parts.next().and_then(|s| s.trim_start_matches('#').parse().ok());
            let force = parts.next() == Some("!");
            match (slot, item) {
                (Some(slot), Some(item)) => Command::Plug { slot, item, force },
                _ => Command::Unsupported(input.into()),
            }
        }
        "unplug" => match parts.next().and_then(|s| s.parse().ok()) {
            Some(slot) => Command::Unplug { slot },
            None => Command::Unsupported(input.into()),
        },
        "box" | "b" => Command::ShowBox,
        "activate" => Command::Activate,
        "deactivate" => Command::Deactivate,
        other => Command::Unsupported(other.into()),
    }
}

/// 槽位编号从 1 开始
fn box_slot(registration: &BoxRegistration, index: usize) -> Option<Entity> {
    index
        .checked_sub(1)
        .and_then(|i| registration.slots.get(i))
        .copied()
}

fn uuid_from_id(id: i32) -> Uuid {
    // 用固定 namespace + id 字节生成版本 5 UUID，保证可重复得到同一值
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &id.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slot_commands() {
        assert_eq!(
            parse_command("plug 3 #17 !"),
            Command::Plug {
                slot: 3,
                item: 17,
                force: true
            }
        );
        assert_eq!(
            parse_command("plug 1 4"),
            Command::Plug {
                slot: 1,
                item: 4,
                force: false
            }
        );
        assert_eq!(parse_command("unplug 12"), Command::Unplug { slot: 12 });
        assert!(matches!(parse_command("plug x"), Command::Unsupported(_)));
    }

    #[test]
    fn parses_spawn_with_default_count() {
        assert_eq!(parse_command("spawn 594"), Command::Spawn { id: 594, count: 1 });
        assert_eq!(parse_command("SPAWN 603 20"), Command::Spawn { id: 603, count: 20 });
        assert!(matches!(parse_command("spawn"), Command::Unsupported(_)));
    }

    #[test]
    fn slot_numbers_start_at_one() {
        let registration = BoxRegistration {
            composite: None,
            slots: vec![Entity::from_raw(7), Entity::from_raw(8)],
            created_this_session: true,
        };
        assert_eq!(box_slot(&registration, 0), None);
        assert_eq!(box_slot(&registration, 2), Some(Entity::from_raw(8)));
        assert_eq!(box_slot(&registration, 3), None);
    }

    #[test]
    fn uuid_is_stable_per_type_id() {
        assert_eq!(uuid_from_id(594), uuid_from_id(594));
        assert_ne!(uuid_from_id(594), uuid_from_id(603));
    }
}
