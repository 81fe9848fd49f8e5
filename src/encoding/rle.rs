//! RunLength 列：连续相同的值只存一次，附带重复次数
//!
//! payload 为若干 `varint(run) + varint(len) + bytes`。没有长串重复时比 Raw 略大。

use crate::common::{CodecError, ColumnType, Result};
use crate::encoding::{text_bytes, ColumnDecoder, ColumnEncoder, MAX_BLOCK_ROWS};
use crate::field_type::Value;
use crate::header::frame_column;
use crate::varint;

#[derive(Default)]
pub struct RunLengthEncoder {
    name:        String,
    run_counter: u32,
    previous:    Option<Vec<u8>>,
    runs:        Vec<(u32, Vec<u8>)>,
}

impl RunLengthEncoder {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        match self.previous.as_deref() {
            Some(prev) if prev != bytes => {
                self.close_run();
                self.previous    = Some(bytes.to_vec());
                self.run_counter = 1;
            }
            Some(_) => self.run_counter += 1,
            None => {
                self.previous    = Some(bytes.to_vec());
                self.run_counter = 1;
            }
        }
    }

    /// 已结束的游程（不含当前未关闭的）
    pub fn runs(&self) -> &[(u32, Vec<u8>)] {
        &self.runs
    }

    fn close_run(&mut self) {
        if let Some(prev) = self.previous.take() {
            if self.run_counter > 0 {
                self.runs.push((self.run_counter, prev));
            }
        }
        self.run_counter = 0;
    }
}

impl ColumnEncoder for RunLengthEncoder {
    fn name(&self) -> &str { &self.name }
    fn column_type(&self) -> ColumnType { ColumnType::RunLength }

    fn push(&mut self, value: Option<&Value>) -> Result<()> {
        self.push_bytes(&text_bytes(value));
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        self.close_run();
        let mut payload = Vec::new();
        for (run, value) in self.runs.drain(..) {
            varint::write_unsigned(&mut payload, run as u64);
            varint::write_chunk(&mut payload, &value);
        }
        frame_column(ColumnType::RunLength, &payload)
    }

    fn reset(&mut self) {
        self.previous    = None;
        self.run_counter = 0;
        self.runs.clear();
    }
}

// ── 解码 ──────────────────────────────────────────────────────────────────────

pub struct RunLengthDecoder;

impl RunLengthDecoder {
    pub fn decode_runs(&self, payload: &[u8]) -> Result<Vec<(u32, Vec<u8>)>> {
        let mut cur  = payload;
        let mut runs = Vec::new();
        while !cur.is_empty() {
            let run   = varint::read_unsigned32(&mut cur)?;
            let value = varint::take_chunk(&mut cur)?.to_vec();
            runs.push((run, value));
        }
        Ok(runs)
    }
}

impl ColumnDecoder for RunLengthDecoder {
    /// 游程数来自线上字节，展开前先核对累计行数
    fn decode(&self, payload: &[u8]) -> Result<Vec<Value>> {
        let mut out = Vec::new();
        for (run, value) in self.decode_runs(payload)? {
            let run = run as usize;
            if run > MAX_BLOCK_ROWS - out.len() {
                return Err(CodecError::Corrupt(format!(
                    "run of {run} values after {} rows exceeds {MAX_BLOCK_ROWS} rows per block",
                    out.len()
                )));
            }
            out.try_reserve(run)
                .map_err(|e| CodecError::Corrupt(format!("cannot expand run of {run} values: {e}")))?;
            let value = Value::from_text_bytes(value);
            out.extend(std::iter::repeat(value).take(run));
        }
        Ok(out)
    }
}
