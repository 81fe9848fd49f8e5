//! 列编码
//!
//! 支持四种编码（五个列类型）：
//! - **Raw**：长度前缀字节块，值由 `ValueCodec` 序列化
//! - **DeltaInt / DeltaLong**：与前一值的差，zig-zag 变长整数
//! - **Text255**：按频次排序的单字节索引字典（最多 255 项）
//! - **RunLength**：(run, value) 对，适合长串重复值
//!
//! 每个编码器持有自己的缓冲区和运行状态；`flush` 产出带 9 字节列头的列块，
//! 并把状态复位到初始值，因此状态不会跨块。

use std::sync::Arc;

use crate::common::{CodecError, ColumnType, Result};
use crate::field_type::{ColumnSchema, Value};
use crate::value_codec::ValueCodec;

pub mod delta;
pub mod dict;
pub mod raw;
pub mod rle;

pub use delta::{DeltaDecoder, DeltaEncoder, DeltaIntEncoder, DeltaLongEncoder};
pub use dict::{Text255Decoder, Text255Encoder};
pub use raw::{RawDecoder, RawEncoder};
pub use rle::{RunLengthDecoder, RunLengthEncoder};

/// 单个块解码出的行数上限；超出视为数据损坏
pub const MAX_BLOCK_ROWS: usize = 1 << 22;

// ── 统一接口 ──────────────────────────────────────────────────────────────────

pub trait ColumnEncoder: Send {
    fn name(&self) -> &str;
    fn column_type(&self) -> ColumnType;

    /// 追加一行的值；None / Null 由各编码器替换为类型默认值
    fn push(&mut self, value: Option<&Value>) -> Result<()>;

    /// 产出完整列块（列头 + payload）并复位
    fn flush(&mut self) -> Result<Vec<u8>>;

    /// 丢弃已累积的值和运行状态
    fn reset(&mut self);
}

pub trait ColumnDecoder {
    /// `payload` 为列头之后、长度恰为 `payload_len` 的字节
    fn decode(&self, payload: &[u8]) -> Result<Vec<Value>>;
}

// ── 工厂 ──────────────────────────────────────────────────────────────────────

pub fn create_encoder(
    schema: &ColumnSchema,
    codec:  Arc<dyn ValueCodec>,
) -> Result<Box<dyn ColumnEncoder>> {
    let name = schema.name.as_str();
    let enc: Box<dyn ColumnEncoder> = match schema.column_type {
        ColumnType::Raw       => Box::new(RawEncoder::new(name, codec)),
        ColumnType::RunLength => Box::new(RunLengthEncoder::new(name)),
        ColumnType::Text255   => Box::new(Text255Encoder::new(name)),
        ColumnType::DeltaInt  => Box::new(DeltaIntEncoder::new(name)),
        ColumnType::DeltaLong => Box::new(DeltaLongEncoder::new(name)),
        ty @ (ColumnType::VariableLength | ColumnType::ByteDictionary) =>
            return Err(CodecError::Unimplemented(ty)),
    };
    Ok(enc)
}

pub fn create_decoder(
    column_type: ColumnType,
    codec:       Arc<dyn ValueCodec>,
) -> Result<Box<dyn ColumnDecoder>> {
    let dec: Box<dyn ColumnDecoder> = match column_type {
        ColumnType::Raw       => Box::new(RawDecoder::new(codec)),
        ColumnType::RunLength => Box::new(RunLengthDecoder),
        ColumnType::Text255   => Box::new(Text255Decoder),
        ColumnType::DeltaInt  => Box::new(DeltaDecoder::<i32>::new()),
        ColumnType::DeltaLong => Box::new(DeltaDecoder::<i64>::new()),
        ty @ (ColumnType::VariableLength | ColumnType::ByteDictionary) =>
            return Err(CodecError::Unimplemented(ty)),
    };
    Ok(dec)
}

/// 文本类列（Text255 / RunLength）对缺失值的处理：空串
pub(crate) fn text_bytes(value: Option<&Value>) -> Vec<u8> {
    value.map(Value::to_text_bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{ColumnHeader, COLUMN_HEADER_SIZE};
    use crate::value_codec::BincodeValueCodec;
    use test_log::test;

    fn codec() -> Arc<dyn ValueCodec> { Arc::new(BincodeValueCodec) }

    #[test]
    fn reserved_types_have_no_codec() {
        for ty in [ColumnType::VariableLength, ColumnType::ByteDictionary] {
            let schema = ColumnSchema::new("v", ty);
            assert!(matches!(create_encoder(&schema, codec()), Err(CodecError::Unimplemented(t)) if t == ty));
            assert!(matches!(create_decoder(ty, codec()), Err(CodecError::Unimplemented(t)) if t == ty));
        }
    }

    #[test]
    fn missing_values_frame_for_every_type() {
        for ty in [
            ColumnType::Raw, ColumnType::RunLength, ColumnType::Text255,
            ColumnType::DeltaInt, ColumnType::DeltaLong,
        ] {
            let mut enc = create_encoder(&ColumnSchema::new("c", ty), codec()).unwrap();
            assert_eq!(enc.column_type(), ty);
            assert_eq!(enc.name(), "c");
            enc.push(Some(&Value::Null)).unwrap();
            enc.push(None).unwrap();
            let block  = enc.flush().unwrap();
            let header = ColumnHeader::read(&mut block.as_slice()).unwrap();
            assert_eq!(header.column_type, ty);
            assert_eq!(header.length as usize, block.len() - COLUMN_HEADER_SIZE);

            let decoded = create_decoder(ty, codec()).unwrap()
                .decode(&block[COLUMN_HEADER_SIZE..]).unwrap();
            assert_eq!(decoded.len(), 2, "{ty}");
        }
    }
}
