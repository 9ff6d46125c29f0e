//! 按名字读写宿主物品字段。
//!
//! 宿主的物品对象不对外公开重量相关字段，[`AttributeSurface`] 是宿主额外授予的
//! 结构访问能力：它能直接触及私有 / 内部字段，绕过了宿主正常的封装。
//! 除本模块与 `stat_table` 以外的代码都不应直接调用它。

use bevy::log::debug;

use super::stat_table::StatTable;
use super::value::{Value, ValueKind};
use crate::core::error::BoxError;

/// 字段声明：类型 + 是否可写
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldDecl {
    pub kind: ValueKind,
    pub writable: bool,
}

impl FieldDecl {
    pub const fn rw(kind: ValueKind) -> Self {
        Self { kind, writable: true }
    }

    pub const fn ro(kind: ValueKind) -> Self {
        Self {
            kind,
            writable: false,
        }
    }
}

/// 宿主对象的结构访问能力（每个已知宿主版本各有一份字段映射）
pub trait AttributeSurface {
    fn declaration(&self, name: &str) -> Option<FieldDecl>;

    fn read_attribute(&self, name: &str) -> Option<Value>;

    /// 只会收到已转换成声明类型的值
    fn write_attribute(&mut self, name: &str, value: Value) -> Result<(), BoxError>;

    /// 调用宿主方法；`None` 表示没有这个方法
    fn invoke(&mut self, _method: &str) -> Option<Result<(), BoxError>> {
        None
    }

    fn has_nested(&self, _name: &str) -> bool {
        false
    }

    fn nested_table(&mut self, _name: &str) -> Option<&mut dyn StatTable> {
        None
    }
}

/// 写入字段；类型不一致时先做转换，转换失败则什么都不写
pub fn set<S>(target: &mut S, name: &str, value: impl Into<Value>) -> Result<(), BoxError>
where
    S: AttributeSurface + ?Sized,
{
    let decl = target
        .declaration(name)
        .filter(|decl| decl.writable)
        .ok_or_else(|| BoxError::AttributeNotFound(name.to_string()))?;

    let value = value.into();
    let found = value.kind().name();
    let value = value
        .coerce(decl.kind)
        .ok_or_else(|| BoxError::TypeCoercionFailure {
            name: name.to_string(),
            expected: decl.kind.name(),
            found,
        })?;

    target.write_attribute(name, value)
}

pub fn try_set<S>(target: &mut S, name: &str, value: impl Into<Value>) -> bool
where
    S: AttributeSurface + ?Sized,
{
    match set(target, name, value) {
        Ok(()) => true,
        Err(err) => {
            debug!("[AmmoBox] {err}");
            false
        }
    }
}

/// 依次尝试多个候选名，第一个成功即返回
pub fn try_set_first<S>(target: &mut S, candidates: &[&str], value: impl Into<Value>) -> bool
where
    S: AttributeSurface + ?Sized,
{
    let value = value.into();
    candidates
        .iter()
        .any(|name| try_set(&mut *target, name, value.clone()))
}

/// 按数值读取；缺失、无法解析或本身是 NaN 都视为读不到
pub fn read_number<S>(target: &S, name: &str) -> Option<f64>
where
    S: AttributeSurface + ?Sized,
{
    target
        .read_attribute(name)?
        .as_number()
        .filter(|v| !v.is_nan())
}

pub fn read_first_number<S>(target: &S, candidates: &[&str]) -> Option<f64>
where
    S: AttributeSurface + ?Sized,
{
    candidates.iter().find_map(|name| read_number(target, name))
}

/// NaN 表示“缺失或无法解析”
pub fn get_float<S>(target: &S, name: &str) -> f32
where
    S: AttributeSurface + ?Sized,
{
    read_number(target, name).map_or(f32::NAN, |v| v as f32)
}

/// 调用宿主钩子。方法不存在返回 false；调用失败记录后吞掉
pub fn try_invoke<S>(target: &mut S, method: &str) -> bool
where
    S: AttributeSurface + ?Sized,
{
    match target.invoke(method) {
        None => false,
        Some(Ok(())) => true,
        Some(Err(err)) => {
            debug!("[AmmoBox] {err}");
            false
        }
    }
}
