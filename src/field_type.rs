//! 字段值与列 schema

use serde::{Deserialize, Serialize};

use crate::common::ColumnType;

/// 一列的 schema：字段名 + 编码类型。写入每个块的块头
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name:        String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnSchema {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type }
    }
    pub fn raw(name: &str)        -> Self { Self::new(name, ColumnType::Raw) }
    pub fn run_length(name: &str) -> Self { Self::new(name, ColumnType::RunLength) }
    pub fn text255(name: &str)    -> Self { Self::new(name, ColumnType::Text255) }
    pub fn delta_int(name: &str)  -> Self { Self::new(name, ColumnType::DeltaInt) }
    pub fn delta_long(name: &str) -> Self { Self::new(name, ColumnType::DeltaLong) }
}

/// 字段值（运行时表示）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bytes(Vec<u8>),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 数值列使用的整数视图；浮点截断，文本按十进制解析
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int8(v)    => Some(*v as i64),
            Self::Int16(v)   => Some(*v as i64),
            Self::Int32(v)   => Some(*v as i64),
            Self::Int64(v)   => Some(*v),
            Self::Float32(v) => Some(*v as i64),
            Self::Float64(v) => Some(*v as i64),
            Self::Text(s)    => s.trim().parse().ok(),
            Self::Null | Self::Bytes(_) => None,
        }
    }

    /// 文本列/游程列使用的字节视图；Null 为空串
    pub fn to_text_bytes(&self) -> Vec<u8> {
        match self {
            Self::Null     => Vec::new(),
            Self::Bytes(b) => b.clone(),
            Self::Text(s)  => s.as_bytes().to_vec(),
            other          => other.to_string().into_bytes(),
        }
    }

    /// 文本列解码：合法 UTF-8 还原为 Text，否则保留原始字节
    pub fn from_text_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(s)  => Self::Text(s),
            Err(e) => Self::Bytes(e.into_bytes()),
        }
    }
}

impl From<i32> for Value    { fn from(v: i32) -> Self    { Self::Int32(v) } }
impl From<i64> for Value    { fn from(v: i64) -> Self    { Self::Int64(v) } }
impl From<f64> for Value    { fn from(v: f64) -> Self    { Self::Float64(v) } }
impl From<&str> for Value   { fn from(v: &str) -> Self   { Self::Text(v.into()) } }
impl From<String> for Value { fn from(v: String) -> Self { Self::Text(v) } }
impl From<Vec<u8>> for Value { fn from(v: Vec<u8>) -> Self { Self::Bytes(v) } }

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null       => write!(f, "NULL"),
            Self::Int8(v)    => write!(f, "{v}"),
            Self::Int16(v)   => write!(f, "{v}"),
            Self::Int32(v)   => write!(f, "{v}"),
            Self::Int64(v)   => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bytes(b)   => write!(f, "{}", String::from_utf8_lossy(b)),
            Self::Text(s)    => write!(f, "{s}"),
        }
    }
}
