//! 全局基础类型与错误定义

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 块头与列头中写入的格式版本
pub const FORMAT_VERSION: u8 = 1;

// ── 列类型 ────────────────────────────────────────────────────────────────────

/// 列的编码类型；数值 id 直接写入线上格式，不可更改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 长度前缀的原始字节块，值由外部 ValueCodec 序列化
    Raw,
    /// 保留，未实现
    VariableLength,
    /// 保留，未实现
    ByteDictionary,
    RunLength,
    /// 最多 255 项的文本字典
    Text255,
    DeltaInt,
    DeltaLong,
}

impl ColumnType {
    pub fn id(self) -> u32 {
        match self {
            Self::Raw            => 0,
            Self::VariableLength => 1,
            Self::ByteDictionary => 2,
            Self::RunLength      => 3,
            Self::Text255        => 4,
            Self::DeltaInt       => 5,
            Self::DeltaLong      => 6,
        }
    }

    /// 由线上 id 还原类型；未知 id 直接报错，不做猜测
    pub fn from_id(id: u32) -> Result<Self> {
        match id {
            0 => Ok(Self::Raw),
            1 => Ok(Self::VariableLength),
            2 => Ok(Self::ByteDictionary),
            3 => Ok(Self::RunLength),
            4 => Ok(Self::Text255),
            5 => Ok(Self::DeltaInt),
            6 => Ok(Self::DeltaLong),
            _ => Err(CodecError::UnsupportedColumnType(id)),
        }
    }

    /// 保留 id（1、2）没有编解码实现
    pub fn is_implemented(self) -> bool {
        !matches!(self, Self::VariableLength | Self::ByteDictionary)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, self.id())
    }
}

// ── 错误 ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported column type id: {0}")]
    UnsupportedColumnType(u32),
    #[error("column type {0} is reserved and has no codec")]
    Unimplemented(ColumnType),
    #[error("varint is too long or overflows its target width")]
    VarIntOverflow,
    #[error("field name for column at offset {index} is missing or not UTF-8")]
    InvalidFieldName { index: usize },
    #[error("corrupt block: {0}")]
    Corrupt(String),
    #[error("column `{column}` decoded {actual} values, expected {expected}")]
    ColumnCountMismatch { column: String, expected: usize, actual: usize },
    #[error("cannot skip column `{column}`: {remaining} payload bytes left unread")]
    SkipUnderflow { column: String, remaining: u64 },
    #[error("value codec error: {0}")]
    ValueCodec(String),
    #[error("column `{column}` cannot hold value {value}")]
    ValueType { column: String, value: String },
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
