//! 驱动无关的单元格值与原生类型描述
//!
//! [`Value`] 是记录字段与驱动之间传值的统一载体，每个变体内部都带
//! `Option`，NULL 因此保留了自己的类型信息（PostgreSQL 绑定参数时
//! 需要知道 NULL 的类型）。[`ColumnType`] 把具体的 Rust 字段类型接入
//! 这套值系统，由 derive 宏在生成的 `get`/`set` 中调用。

use chrono::NaiveDateTime;

use crate::error::{Error, Result};

/// 原生类型的大类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    UInt,
    Float,
    Str,
    Bytes,
    DateTime,
}

impl Kind {
    /// 该类型对应的 NULL 值
    pub fn null(self) -> Value {
        match self {
            Kind::Bool => Value::Bool(None),
            Kind::Int => Value::Int(None),
            Kind::UInt => Value::UInt(None),
            Kind::Float => Value::Float(None),
            Kind::Str => Value::Str(None),
            Kind::Bytes => Value::Bytes(None),
            Kind::DateTime => Value::DateTime(None),
        }
    }

    /// 该类型的非 NULL 零值
    pub fn zero(self) -> Value {
        match self {
            Kind::Bool => Value::Bool(Some(false)),
            Kind::Int => Value::Int(Some(0)),
            Kind::UInt => Value::UInt(Some(0)),
            Kind::Float => Value::Float(Some(0.0)),
            Kind::Str => Value::Str(Some(String::new())),
            Kind::Bytes => Value::Bytes(Some(Vec::new())),
            Kind::DateTime => Value::DateTime(Some(NaiveDateTime::default())),
        }
    }
}

/// 列的原生类型描述，方言据此映射 SQL 类型
///
/// `nullable` 表示字段本身是 `Option<T>`（对应 `NullInt64` 一族包装）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeType {
    pub kind: Kind,
    pub nullable: bool,
}

impl NativeType {
    /// 缓存在列上的零值：可空类型的零值是 NULL，否则是类型零值
    pub fn zero(&self) -> Value {
        if self.nullable {
            self.kind.null()
        } else {
            self.kind.zero()
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, Kind::Int | Kind::UInt)
    }
}

/// 带类型的单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(Option<bool>),
    Int(Option<i64>),
    UInt(Option<u64>),
    Float(Option<f64>),
    Str(Option<String>),
    Bytes(Option<Vec<u8>>),
    DateTime(Option<NaiveDateTime>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            Value::Bool(None)
                | Value::Int(None)
                | Value::UInt(None)
                | Value::Float(None)
                | Value::Str(None)
                | Value::Bytes(None)
                | Value::DateTime(None)
        )
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::UInt(_) => Kind::UInt,
            Value::Float(_) => Kind::Float,
            Value::Str(_) => Kind::Str,
            Value::Bytes(_) => Kind::Bytes,
            Value::DateTime(_) => Kind::DateTime,
        }
    }
}

fn invalid(expected: &'static str) -> Error {
    Error::InvalidKind {
        field: String::new(),
        expected,
    }
}

/// 可以作为列持久化的字段类型
///
/// `from_value` 允许宽松转换：整数窄化带范围检查，布尔接受 0/1，
/// 时间列接受 RFC3339 或 `%Y-%m-%d %H:%M:%S%.f` 格式的字符串。
pub trait ColumnType: Sized {
    const NATIVE: NativeType;

    fn to_value(&self) -> Value;
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! signed_column {
    ($($t:ty),+) => {$(
        impl ColumnType for $t {
            const NATIVE: NativeType = NativeType { kind: Kind::Int, nullable: false };

            fn to_value(&self) -> Value {
                Value::Int(Some(*self as i64))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::Int(Some(v)) => <$t>::try_from(v).map_err(|_| invalid("integer")),
                    Value::UInt(Some(v)) => <$t>::try_from(v).map_err(|_| invalid("integer")),
                    _ => Err(invalid("integer")),
                }
            }
        }
    )+};
}

macro_rules! unsigned_column {
    ($($t:ty),+) => {$(
        impl ColumnType for $t {
            const NATIVE: NativeType = NativeType { kind: Kind::UInt, nullable: false };

            fn to_value(&self) -> Value {
                Value::UInt(Some(*self as u64))
            }

            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::UInt(Some(v)) => <$t>::try_from(v).map_err(|_| invalid("unsigned integer")),
                    Value::Int(Some(v)) => <$t>::try_from(v).map_err(|_| invalid("unsigned integer")),
                    _ => Err(invalid("unsigned integer")),
                }
            }
        }
    )+};
}

signed_column!(i8, i16, i32, i64);
unsigned_column!(u8, u16, u32, u64);

impl ColumnType for bool {
    const NATIVE: NativeType = NativeType {
        kind: Kind::Bool,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::Bool(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(Some(v)) => Ok(v),
            Value::Int(Some(0)) | Value::UInt(Some(0)) => Ok(false),
            Value::Int(Some(1)) | Value::UInt(Some(1)) => Ok(true),
            _ => Err(invalid("bool")),
        }
    }
}

impl ColumnType for f32 {
    const NATIVE: NativeType = NativeType {
        kind: Kind::Float,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::Float(Some(f64::from(*self)))
    }

    fn from_value(value: Value) -> Result<Self> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl ColumnType for f64 {
    const NATIVE: NativeType = NativeType {
        kind: Kind::Float,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::Float(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(Some(v)) => Ok(v),
            Value::Int(Some(v)) => Ok(v as f64),
            Value::UInt(Some(v)) => Ok(v as f64),
            _ => Err(invalid("float")),
        }
    }
}

impl ColumnType for String {
    const NATIVE: NativeType = NativeType {
        kind: Kind::Str,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::Str(Some(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(Some(v)) => Ok(v),
            _ => Err(invalid("string")),
        }
    }
}

impl ColumnType for Vec<u8> {
    const NATIVE: NativeType = NativeType {
        kind: Kind::Bytes,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::Bytes(Some(self.clone()))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(Some(v)) => Ok(v),
            Value::Str(Some(v)) => Ok(v.into_bytes()),
            _ => Err(invalid("bytes")),
        }
    }
}

impl ColumnType for NaiveDateTime {
    const NATIVE: NativeType = NativeType {
        kind: Kind::DateTime,
        nullable: false,
    };

    fn to_value(&self) -> Value {
        Value::DateTime(Some(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(Some(v)) => Ok(v),
            Value::Str(Some(raw)) => parse_datetime(&raw),
            _ => Err(invalid("datetime")),
        }
    }
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.naive_utc());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(parsed);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(parsed);
    }
    Err(invalid("datetime"))
}

impl<T: ColumnType> ColumnType for Option<T> {
    const NATIVE: NativeType = NativeType {
        kind: T::NATIVE.kind,
        nullable: true,
    };

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => T::NATIVE.kind.null(),
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_values() {
        let t = NativeType {
            kind: Kind::Int,
            nullable: false,
        };
        assert_eq!(t.zero(), Value::Int(Some(0)));

        let t = NativeType {
            kind: Kind::Int,
            nullable: true,
        };
        assert_eq!(t.zero(), Value::Int(None));
        assert!(t.zero().is_null());

        let t = NativeType {
            kind: Kind::Str,
            nullable: false,
        };
        assert_eq!(t.zero(), Value::Str(Some(String::new())));
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(i32::from_value(Value::Int(Some(5))).unwrap(), 5);
        assert_eq!(i16::from_value(Value::UInt(Some(7))).unwrap(), 7);

        // 窄化越界
        assert!(i8::from_value(Value::Int(Some(1000))).is_err());
        // 负数不能进无符号
        assert!(u32::from_value(Value::Int(Some(-1))).is_err());
        // 类型不符
        assert!(i64::from_value(Value::Str(Some("5".into()))).is_err());
    }

    #[test]
    fn test_bool_accepts_integers() {
        assert!(bool::from_value(Value::Int(Some(1))).unwrap());
        assert!(!bool::from_value(Value::Int(Some(0))).unwrap());
        assert!(bool::from_value(Value::Int(Some(2))).is_err());
    }

    #[test]
    fn test_option_roundtrip() {
        let v: Option<i64> = None;
        assert_eq!(v.to_value(), Value::Int(None));
        assert_eq!(<Option<i64>>::NATIVE.nullable, true);

        let back = <Option<String>>::from_value(Value::Str(None)).unwrap();
        assert_eq!(back, None);
        let back = <Option<String>>::from_value(Value::Str(Some("x".into()))).unwrap();
        assert_eq!(back, Some("x".to_string()));
    }

    #[test]
    fn test_datetime_from_string() {
        let dt = NaiveDateTime::from_value(Value::Str(Some("2024-01-15 10:30:45".into()))).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 10:30:45");

        let dt = NaiveDateTime::from_value(Value::Str(Some("2024-01-15T10:30:45Z".into()))).unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 10:30:45");

        assert!(NaiveDateTime::from_value(Value::Str(Some("not a date".into()))).is_err());
    }

    #[test]
    fn test_bytes_from_string() {
        let b = <Vec<u8>>::from_value(Value::Str(Some("ab".into()))).unwrap();
        assert_eq!(b, b"ab");
    }
}
