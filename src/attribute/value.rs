//! 宿主字段的取值与有限的类型转换。
//!
//! 只支持 float / double / int / bool / text 五种声明类型，
//! 转换规则固定在 [`Value::coerce`] 中，不做任意类型间的转换。

use std::fmt;

/// 宿主字段的声明类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Float,
    Double,
    Int,
    Bool,
    Text,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Float => "float",
            ValueKind::Double => "double",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::Text => "text",
        }
    }
}

/// 读写宿主字段时使用的值
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Float(f32),
    Double(f64),
    Int(i32),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// 按数值读取。bool 不算数值；文本会尝试解析。
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(f64::from(*v)),
            Value::Bool(_) => None,
            Value::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// 转换成目标声明类型，失败返回 `None`（调用方据此放弃写入）
    pub fn coerce(self, target: ValueKind) -> Option<Value> {
        if self.kind() == target {
            return Some(self);
        }

        match target {
            ValueKind::Float => {
                let v = self.coercible_number()?;
                narrow_to_f32(v).map(Value::Float)
            }
            ValueKind::Double => self.coercible_number().map(Value::Double),
            ValueKind::Int => match self {
                Value::Text(s) => s.trim().parse::<i32>().ok().map(Value::Int),
                other => {
                    let v = other.coercible_number()?.round();
                    if v.is_finite() && v >= f64::from(i32::MIN) && v <= f64::from(i32::MAX) {
                        Some(Value::Int(v as i32))
                    } else {
                        None
                    }
                }
            },
            ValueKind::Bool => match self {
                Value::Text(s) => parse_bool(&s).map(Value::Bool),
                other => other.coercible_number().map(|v| Value::Bool(v != 0.0)),
            },
            ValueKind::Text => Some(Value::Text(self.to_string())),
        }
    }

    // 写入时 bool 可以当作 1 / 0
    fn coercible_number(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_number(),
        }
    }
}

fn narrow_to_f32(v: f64) -> Option<f32> {
    if v.is_finite() && v.abs() > f64::from(f32::MAX) {
        None
    } else {
        Some(v as f32)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_kind_passes_through() {
        assert_eq!(
            Value::Float(1.5).coerce(ValueKind::Float),
            Some(Value::Float(1.5))
        );
    }

    #[test]
    fn numbers_widen_and_narrow() {
        assert_eq!(
            Value::Float(0.5).coerce(ValueKind::Double),
            Some(Value::Double(0.5))
        );
        assert_eq!(
            Value::Double(2.0).coerce(ValueKind::Float),
            Some(Value::Float(2.0))
        );
        assert_eq!(
            Value::Int(500882).coerce(ValueKind::Float),
            Some(Value::Float(500882.0))
        );
        assert_eq!(Value::Double(1e300).coerce(ValueKind::Float), None);
    }

    #[test]
    fn int_target_rounds_and_checks_range() {
        assert_eq!(Value::Float(2.6).coerce(ValueKind::Int), Some(Value::Int(3)));
        assert_eq!(Value::Double(1e12).coerce(ValueKind::Int), None);
        assert_eq!(Value::Float(f32::NAN).coerce(ValueKind::Int), None);
        assert_eq!(
            Value::from("500882").coerce(ValueKind::Int),
            Some(Value::Int(500882))
        );
        assert_eq!(Value::from("1.5").coerce(ValueKind::Int), None);
    }

    #[test]
    fn text_parsing() {
        assert_eq!(
            Value::from(" 0.25 ").coerce(ValueKind::Float),
            Some(Value::Float(0.25))
        );
        assert_eq!(Value::from("heavy").coerce(ValueKind::Float), None);
        assert_eq!(
            Value::from("TRUE").coerce(ValueKind::Bool),
            Some(Value::Bool(true))
        );
        assert_eq!(Value::from("yes").coerce(ValueKind::Bool), None);
    }

    #[test]
    fn bool_is_not_read_as_number() {
        assert_eq!(Value::Bool(true).as_number(), None);
        assert_eq!(
            Value::Bool(true).coerce(ValueKind::Float),
            Some(Value::Float(1.0))
        );
        assert_eq!(Value::Int(0).coerce(ValueKind::Bool), Some(Value::Bool(false)));
    }

    #[test]
    fn anything_becomes_text() {
        assert_eq!(
            Value::Int(7).coerce(ValueKind::Text),
            Some(Value::Text("7".into()))
        );
    }
}
