pub mod loader;
pub mod schema;

use bevy::asset::LoadState;
use bevy::prelude::*;
use loader::RonLoader;
use schema::{ItemList, ModSettings};

use crate::core::states::AppState;
use crate::host::registry::{ItemRegistry, MerchantDatabase, MerchantProfile, StockEntry};

// --------------------------- 资源 ---------------------------
#[derive(Resource, Default)]
pub struct DataAssets {
    items: Option<Handle<ItemList>>,
    settings: Option<Handle<ModSettings>>,
}

// --------------------------- 插件 ---------------------------
pub struct DataPlugin;
impl Plugin for DataPlugin {
    fn build(&self, app: &mut App) {
        app
            // 注册资产类型 & Loader
            .init_asset::<ItemList>()
            .init_asset::<ModSettings>()
            .register_asset_loader(RonLoader::<ItemList>::new(&["items.ron"]))
            .register_asset_loader(RonLoader::<ModSettings>::new(&["box.ron"]))
            .init_resource::<DataAssets>()
            .init_resource::<ModSettings>()
            // Loading 流程
            .add_systems(OnEnter(AppState::Loading), start_loading)
            .add_systems(
                Update,
                check_loaded.run_if(in_state(AppState::Loading)),
            );
    }
}

// --------------------------- 系统 ---------------------------
fn start_loading(mut data: ResMut<DataAssets>, asset_server: Res<AssetServer>) {
    data.items = Some(asset_server.load("data/host.items.ron"));
    data.settings = Some(asset_server.load("data/ammo_box.box.ron"));
}

/// 加载状态：`None` 仍在加载，`Some(None)` 失败，`Some(Some(_))` 成功
fn poll<'a, A: Asset>(
    server: &AssetServer,
    assets: &'a Assets<A>,
    handle: &Option<Handle<A>>,
) -> Option<Option<&'a A>> {
    let handle = handle.as_ref()?;
    if let Some(asset) = assets.get(handle) {
        return Some(Some(asset));
    }
    match server.load_state(handle.id()) {
        LoadState::Failed(err) => {
            error!("资产加载失败: {err}");
            Some(None)
        }
        _ => None,
    }
}

fn check_loaded(
    mut commands: Commands,
    mut next: ResMut<NextState<AppState>>,
    data: Res<DataAssets>,
    asset_server: Res<AssetServer>,
    lists: Res<Assets<ItemList>>,
    settings: Res<Assets<ModSettings>>,
) {
    let Some(list) = poll(&asset_server, &lists, &data.items) else {
        return;
    };
    let Some(loaded_settings) = poll(&asset_server, &settings, &data.settings) else {
        return;
    };

    match loaded_settings.map(|s| (s, s.validate())) {
        Some((s, Ok(()))) => commands.insert_resource(s.clone()),
        Some((_, Err(err))) => warn!("配置无效，使用默认值: {err}"),
        None => warn!("缺少配置，使用默认值"),
    }

    if let Some(list) = list {
        let (registry, merchants) = host_tables(list);
        commands.insert_resource(registry);
        commands.insert_resource(merchants);
        println!("✔ Items loaded: {}", list.items.len());
    }

    next.set(AppState::InGame);
}

/// 由物品清单建出宿主的模板表与商人库存
pub fn host_tables(list: &ItemList) -> (ItemRegistry, MerchantDatabase) {
    let mut registry = ItemRegistry::default();
    let mut merchants = MerchantDatabase::default();
    for entry in &list.items {
        registry.insert_template(entry.to_host_item());
    }
    for merchant in &list.merchants {
        let entries = merchant.stock.iter().map(|id| StockEntry::new(*id)).collect();
        merchants.insert_profile(merchant.id.clone(), MerchantProfile { entries });
    }
    (registry, merchants)
}
