//! Raw 列：长度前缀块流，不做任何变换
//!
//! 空值只写一个 `varint(0)`。

use std::sync::Arc;

use crate::common::{ColumnType, Result};
use crate::encoding::{ColumnDecoder, ColumnEncoder};
use crate::field_type::Value;
use crate::header::frame_column;
use crate::value_codec::ValueCodec;
use crate::varint;

pub struct RawEncoder {
    name:  String,
    codec: Arc<dyn ValueCodec>,
    buf:   Vec<u8>,
}

impl RawEncoder {
    pub fn new(name: &str, codec: Arc<dyn ValueCodec>) -> Self {
        Self { name: name.into(), codec, buf: Vec::new() }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        varint::write_chunk(&mut self.buf, bytes);
    }
}

impl ColumnEncoder for RawEncoder {
    fn name(&self) -> &str { &self.name }
    fn column_type(&self) -> ColumnType { ColumnType::Raw }

    fn push(&mut self, value: Option<&Value>) -> Result<()> {
        let bytes = self.codec.encode(value)?;
        self.push_bytes(&bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        let block = frame_column(ColumnType::Raw, &self.buf);
        self.buf.clear();
        block
    }

    fn reset(&mut self) {
        self.buf.clear();
    }
}

/// 拆出 payload 中的全部块，直到字节耗尽
pub fn decode_chunks(payload: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut cur    = payload;
    let mut chunks = Vec::new();
    while !cur.is_empty() {
        chunks.push(varint::take_chunk(&mut cur)?.to_vec());
    }
    Ok(chunks)
}

pub struct RawDecoder {
    codec: Arc<dyn ValueCodec>,
}

impl RawDecoder {
    pub fn new(codec: Arc<dyn ValueCodec>) -> Self { Self { codec } }
}

impl ColumnDecoder for RawDecoder {
    fn decode(&self, payload: &[u8]) -> Result<Vec<Value>> {
        decode_chunks(payload)?
            .iter()
            .map(|chunk| self.codec.decode(chunk))
            .collect()
    }
}
