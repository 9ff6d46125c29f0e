//! 宿主对象字段访问层：字段读写、类型转换、内嵌属性表
pub mod accessor;
pub mod stat_table;
pub mod value;

pub use accessor::{AttributeSurface, FieldDecl};
pub use stat_table::StatTable;
pub use value::{Value, ValueKind};
