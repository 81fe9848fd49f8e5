//! Raw 列的值序列化（外部值编解码器接口）
//!
//! 约定：编码结果少于 2 个字节表示“无值”。

use crate::common::{CodecError, Result};
use crate::field_type::Value;

pub trait ValueCodec: Send + Sync {
    fn encode(&self, value: Option<&Value>) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// 少于该字节数的编码视为 Null
pub const MIN_VALUE_BYTES: usize = 2;

/// 默认实现：Null 编码为空，其余走 bincode（带 4 字节变体标签，长度恒 ≥ 4）
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeValueCodec;

impl ValueCodec for BincodeValueCodec {
    fn encode(&self, value: Option<&Value>) -> Result<Vec<u8>> {
        match value.filter(|v| !v.is_null()) {
            None    => Ok(Vec::new()),
            Some(v) => bincode::serialize(v)
                .map_err(|e| CodecError::ValueCodec(e.to_string())),
        }
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.len() < MIN_VALUE_BYTES {
            return Ok(Value::Null);
        }
        bincode::deserialize(bytes)
            .map_err(|e| CodecError::ValueCodec(e.to_string()))
    }
}
