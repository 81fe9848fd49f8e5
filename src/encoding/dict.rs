//! Text255 列：每块一个按频次排序的字典，最多 255 项
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ entry_count   (u8)                   │
//! │ entry_count × │ varint(index)        │
//! │               │ varint(len) + bytes  │
//! │ varint(body_len)                     │
//! │ body: 按写入顺序                      │
//! │   字典值   → 0x01, index(u8)          │
//! │   其余值   → varint(len) + bytes      │
//! └──────────────────────────────────────┘
//! ```
//!
//! 只有出现次数 > 2 的非空值才能进字典。读端把长度为 1 且命中字典编号的块
//! 当作索引，因此写端不会把编号分配给本块中出现过的单字节值。

use std::collections::HashMap;

use byteorder::ReadBytesExt;

use crate::common::{CodecError, ColumnType, Result};
use crate::encoding::{raw::decode_chunks, text_bytes, ColumnDecoder, ColumnEncoder};
use crate::field_type::Value;
use crate::header::frame_column;
use crate::varint;

/// 字典项数上限（条目数写在一个字节里）
pub const MAX_DICT_ENTRIES: usize = 255;
/// 出现次数必须严格大于该值才能进字典
pub const ADMIT_THRESHOLD: u32 = 2;
/// 字典值在 body 中的标记：长度 1 的块
const INDEX_MARKER: u8 = 1;

pub struct Text255Encoder {
    name:     String,
    /// 去重后的值，按首次出现排列
    distinct: Vec<Vec<u8>>,
    counts:   Vec<u32>,
    lookup:   HashMap<Vec<u8>, usize>,
    /// 写入顺序，保留重复；元素为 distinct 下标
    queue:    Vec<usize>,
}

impl Text255Encoder {
    pub fn new(name: &str) -> Self {
        Self {
            name:     name.into(),
            distinct: Vec::new(),
            counts:   Vec::new(),
            lookup:   HashMap::new(),
            queue:    Vec::new(),
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let id = match self.lookup.get(bytes) {
            Some(&id) => id,
            None => {
                let id = self.distinct.len();
                self.distinct.push(bytes.to_vec());
                self.counts.push(0);
                self.lookup.insert(bytes.to_vec(), id);
                id
            }
        };
        self.counts[id] += 1;
        self.queue.push(id);
    }

    /// 为每个 distinct 值分配字典编号，返回 (编号表, 序列化后的字典, 条目数)
    fn build_dictionary(&self) -> (Vec<Option<u8>>, Vec<u8>, usize) {
        // 频次降序；同频次按首次出现先后
        let mut order: Vec<usize> = (0..self.distinct.len()).collect();
        order.sort_by(|&a, &b| self.counts[b].cmp(&self.counts[a]).then(a.cmp(&b)));

        let mut reserved = [false; 256];
        for v in self.distinct.iter().filter(|v| v.len() == 1) {
            reserved[v[0] as usize] = true;
        }

        let mut index_of   = vec![None; self.distinct.len()];
        let mut dict_bytes = Vec::new();
        let mut entries    = 0usize;
        let mut next       = 0usize;

        for id in order {
            if entries == MAX_DICT_ENTRIES || self.counts[id] <= ADMIT_THRESHOLD {
                break;
            }
            let value = &self.distinct[id];
            if value.is_empty() {
                continue;
            }
            while next < reserved.len() && reserved[next] {
                next += 1;
            }
            if next >= reserved.len() {
                break;
            }
            index_of[id] = Some(next as u8);
            varint::write_unsigned(&mut dict_bytes, next as u64);
            varint::write_chunk(&mut dict_bytes, value);
            entries += 1;
            next    += 1;
        }
        (index_of, dict_bytes, entries)
    }

    fn clear(&mut self) {
        self.distinct.clear();
        self.counts.clear();
        self.lookup.clear();
        self.queue.clear();
    }
}

impl ColumnEncoder for Text255Encoder {
    fn name(&self) -> &str { &self.name }
    fn column_type(&self) -> ColumnType { ColumnType::Text255 }

    fn push(&mut self, value: Option<&Value>) -> Result<()> {
        self.push_bytes(&text_bytes(value));
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        let (index_of, dict_bytes, entries) = self.build_dictionary();

        let mut body = Vec::new();
        for &id in &self.queue {
            match index_of[id] {
                Some(index) => {
                    body.push(INDEX_MARKER);
                    body.push(index);
                }
                None => varint::write_chunk(&mut body, &self.distinct[id]),
            }
        }

        let mut payload = Vec::with_capacity(1 + dict_bytes.len() + 5 + body.len());
        payload.push(entries as u8);
        payload.extend_from_slice(&dict_bytes);
        varint::write_unsigned(&mut payload, body.len() as u64);
        payload.extend_from_slice(&body);

        self.clear();
        frame_column(ColumnType::Text255, &payload)
    }

    fn reset(&mut self) {
        self.clear();
    }
}

// ── 解码 ──────────────────────────────────────────────────────────────────────

pub struct Text255Decoder;

impl Text255Decoder {
    /// 返回字典（index → bytes）与按行还原的原始字节
    pub fn decode_bytes(&self, payload: &[u8]) -> Result<(HashMap<u8, Vec<u8>>, Vec<Vec<u8>>)> {
        let mut cur = payload;
        let entries = cur.read_u8()? as usize;
        let mut dict = HashMap::with_capacity(entries);
        for _ in 0..entries {
            let index = varint::read_unsigned32(&mut cur)?;
            let index = u8::try_from(index)
                .map_err(|_| CodecError::Corrupt(format!("dictionary index {index} out of range")))?;
            dict.insert(index, varint::take_chunk(&mut cur)?.to_vec());
        }

        let body_len = varint::read_unsigned32(&mut cur)? as usize;
        if body_len != cur.len() {
            return Err(CodecError::Corrupt(format!(
                "text255 body declares {body_len} bytes, {} remain in column",
                cur.len()
            )));
        }

        let values = decode_chunks(cur)?
            .into_iter()
            .map(|chunk| {
                if chunk.len() == 1 {
                    if let Some(v) = dict.get(&chunk[0]) {
                        return v.clone();
                    }
                }
                chunk
            })
            .collect();
        Ok((dict, values))
    }
}

impl ColumnDecoder for Text255Decoder {
    fn decode(&self, payload: &[u8]) -> Result<Vec<Value>> {
        let (_, values) = self.decode_bytes(payload)?;
        Ok(values.into_iter().map(Value::from_text_bytes).collect())
    }
}
