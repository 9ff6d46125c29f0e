//! 物品图标加载：先检查文件存在，再交给 AssetServer 解码；按路径缓存句柄

use bevy::asset::AssetLoadFailedEvent;
use bevy::prelude::*;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use super::components::HostItem;
use crate::core::error::BoxError;

#[derive(Resource, Default)]
pub struct IconCache {
    // 键为小写路径
    handles: HashMap<String, Handle<Image>>,
}

impl IconCache {
    pub fn load(
        &mut self,
        asset_server: Option<&AssetServer>,
        root: &Path,
        name: &str,
    ) -> Result<Handle<Image>, BoxError> {
        let key = name.to_lowercase();
        if let Some(handle) = self.handles.get(&key) {
            return Ok(handle.clone());
        }

        let full = root.join(name);
        if !full.is_file() {
            return Err(BoxError::AssetLoadFailure(full.display().to_string()));
        }
        let server = asset_server
            .ok_or_else(|| BoxError::AssetLoadFailure(format!("{name} (no asset server)")))?;

        let handle = server.load::<Image>(name.to_string());
        self.handles.insert(key, handle.clone());
        Ok(handle)
    }

    fn forget(&mut self, id: AssetId<Image>) -> Option<String> {
        let key = self
            .handles
            .iter()
            .find(|(_, h)| h.id() == id)
            .map(|(k, _)| k.clone())?;
        self.handles.remove(&key);
        Some(key)
    }
}

/// 与 AssetServer 相同的查找规则：BEVY_ASSET_ROOT → CARGO_MANIFEST_DIR → 可执行文件目录
pub fn asset_root() -> PathBuf {
    let base = env::var_os("BEVY_ASSET_ROOT")
        .or_else(|| env::var_os("CARGO_MANIFEST_DIR"))
        .map(PathBuf::from)
        .or_else(|| {
            env::current_exe()
                .ok()
                .and_then(|exe| exe.parent().map(Path::to_path_buf))
        })
        .unwrap_or_default();
    base.join("assets")
}

/// 解码失败时撤掉图标，物品继续使用默认外观
pub fn report_icon_failures(
    mut failed: EventReader<AssetLoadFailedEvent<Image>>,
    mut cache: ResMut<IconCache>,
    mut items: Query<&mut HostItem>,
) {
    for ev in failed.read() {
        let Some(name) = cache.forget(ev.id) else {
            continue;
        };
        error!("图标 {name} 加载失败: {}", ev.error);
        for mut item in &mut items {
            if item.icon.as_ref().is_some_and(|h| h.id() == ev.id) {
                item.icon = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_asset_failure() {
        let mut cache = IconCache::default();
        let err = cache
            .load(None, Path::new("/nonexistent"), "box.png")
            .unwrap_err();
        assert!(matches!(err, BoxError::AssetLoadFailure(_)));
    }

    #[test]
    fn existing_file_without_server_still_degrades() {
        let mut cache = IconCache::default();
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets");
        let err = cache.load(None, &root, "box.png").unwrap_err();
        assert_eq!(
            err,
            BoxError::AssetLoadFailure("box.png (no asset server)".into())
        );
    }
}
