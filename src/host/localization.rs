//! 文本覆盖表：按语言注入 (key, text)，找不到语言时回退

use anyhow::Context;
use bevy::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;

const STRINGS: &str = include_str!("../../assets/i18n/strings.toml");

#[derive(Deserialize, Debug)]
struct StringsFile {
    fallback: String,
    languages: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug)]
pub struct LocalizationTable {
    fallback: String,
    languages: HashMap<String, HashMap<String, String>>,
}

impl LocalizationTable {
    pub fn parse(src: &str) -> anyhow::Result<Self> {
        let file: StringsFile = toml::from_str(src).context("invalid localization table")?;
        if !file.languages.contains_key(&file.fallback) {
            anyhow::bail!("fallback language {} has no strings", file.fallback);
        }
        Ok(Self {
            fallback: file.fallback,
            languages: file.languages,
        })
    }

    /// 写入指定语言的覆盖文本，返回实际使用的语言
    pub fn apply<'a>(&'a self, language: &'a str, overrides: &mut TextOverrides) -> &'a str {
        let (language, table) = match self.languages.get(language) {
            Some(table) => (language, table),
            None => (self.fallback.as_str(), &self.languages[&self.fallback]),
        };
        for (key, text) in table {
            overrides.0.insert(key.clone(), text.clone());
        }
        language
    }
}

/// 当前生效的覆盖文本
#[derive(Resource, Default, Debug)]
pub struct TextOverrides(HashMap<String, String>);

impl TextOverrides {
    /// 没有覆盖时直接显示 key
    pub fn text<'a>(&'a self, key: &'a str) -> &'a str {
        self.0.get(key).map_or(key, String::as_str)
    }
}

fn system_language() -> &'static str {
    let lang = std::env::var("LANG").unwrap_or_default().to_lowercase();
    if lang.starts_with("pt") {
        "Portuguese"
    } else {
        "English"
    }
}

pub fn apply_system_language(mut overrides: ResMut<TextOverrides>) {
    match LocalizationTable::parse(STRINGS) {
        Ok(table) => {
            let used = table.apply(system_language(), &mut overrides);
            info!("[AmmoBox] 文本语言: {used}");
        }
        Err(err) => error!("[AmmoBox] {err:#}"),
    }
}
