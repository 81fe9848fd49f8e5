//! Delta 列：每个值存为与前一值之差的有符号变长整数
//!
//! 基线在每个块开始时为 0，`flush` 后归零，块之间不传递状态。
//! 差值按列宽做环绕减法，解码端环绕加回，因此全范围精确还原。

use std::marker::PhantomData;

use crate::common::{CodecError, ColumnType, Result};
use crate::encoding::{ColumnDecoder, ColumnEncoder};
use crate::field_type::Value;
use crate::header::frame_column;
use crate::varint;

/// DeltaInt（i32）与 DeltaLong（i64）的宽度差异
pub trait DeltaWidth: Copy + Default + PartialEq + std::fmt::Debug + Send + 'static {
    const COLUMN_TYPE: ColumnType;

    /// 超出宽度时截断（与 i64 → i32 的 `as` 一致）
    fn from_i64(v: i64) -> Self;
    fn wrapping_sub(self, rhs: Self) -> Self;
    fn wrapping_add(self, rhs: Self) -> Self;
    fn write(self, out: &mut Vec<u8>);
    fn read(input: &mut &[u8]) -> Result<Self>;
    fn into_value(self) -> Value;
}

impl DeltaWidth for i32 {
    const COLUMN_TYPE: ColumnType = ColumnType::DeltaInt;

    fn from_i64(v: i64) -> Self { v as i32 }
    fn wrapping_sub(self, rhs: Self) -> Self { i32::wrapping_sub(self, rhs) }
    fn wrapping_add(self, rhs: Self) -> Self { i32::wrapping_add(self, rhs) }
    fn write(self, out: &mut Vec<u8>) { varint::write_signed32(out, self) }
    fn read(input: &mut &[u8]) -> Result<Self> { varint::read_signed32(input) }
    fn into_value(self) -> Value { Value::Int32(self) }
}

impl DeltaWidth for i64 {
    const COLUMN_TYPE: ColumnType = ColumnType::DeltaLong;

    fn from_i64(v: i64) -> Self { v }
    fn wrapping_sub(self, rhs: Self) -> Self { i64::wrapping_sub(self, rhs) }
    fn wrapping_add(self, rhs: Self) -> Self { i64::wrapping_add(self, rhs) }
    fn write(self, out: &mut Vec<u8>) { varint::write_signed64(out, self) }
    fn read(input: &mut &[u8]) -> Result<Self> { varint::read_signed64(input) }
    fn into_value(self) -> Value { Value::Int64(self) }
}

// ── 编码 ──────────────────────────────────────────────────────────────────────

pub struct DeltaEncoder<T: DeltaWidth> {
    name:     String,
    previous: T,
    buf:      Vec<u8>,
}

pub type DeltaIntEncoder  = DeltaEncoder<i32>;
pub type DeltaLongEncoder = DeltaEncoder<i64>;

impl<T: DeltaWidth> DeltaEncoder<T> {
    pub fn new(name: &str) -> Self {
        Self { name: name.into(), previous: T::default(), buf: Vec::new() }
    }

    pub fn push_value(&mut self, value: T) {
        value.wrapping_sub(self.previous).write(&mut self.buf);
        self.previous = value;
    }
}

impl<T: DeltaWidth> ColumnEncoder for DeltaEncoder<T> {
    fn name(&self) -> &str { &self.name }
    fn column_type(&self) -> ColumnType { T::COLUMN_TYPE }

    fn push(&mut self, value: Option<&Value>) -> Result<()> {
        let n = match value {
            None | Some(Value::Null) => T::default(),
            Some(v) => v.as_i64().map(T::from_i64).ok_or_else(|| CodecError::ValueType {
                column: self.name.clone(),
                value:  format!("{v:?}"),
            })?,
        };
        self.push_value(n);
        Ok(())
    }

    fn flush(&mut self) -> Result<Vec<u8>> {
        self.previous = T::default();
        let block = frame_column(T::COLUMN_TYPE, &self.buf);
        self.buf.clear();
        block
    }

    fn reset(&mut self) {
        self.previous = T::default();
        self.buf.clear();
    }
}

// ── 解码 ──────────────────────────────────────────────────────────────────────

pub struct DeltaDecoder<T: DeltaWidth>(PhantomData<T>);

impl<T: DeltaWidth> DeltaDecoder<T> {
    pub fn new() -> Self { Self(PhantomData) }

    pub fn decode_raw(&self, payload: &[u8]) -> Result<Vec<T>> {
        let mut cur      = payload;
        let mut previous = T::default();
        let mut out      = Vec::new();
        while !cur.is_empty() {
            let value = previous.wrapping_add(T::read(&mut cur)?);
            out.push(value);
            previous = value;
        }
        Ok(out)
    }
}

impl<T: DeltaWidth> Default for DeltaDecoder<T> {
    fn default() -> Self { Self::new() }
}

impl<T: DeltaWidth> ColumnDecoder for DeltaDecoder<T> {
    fn decode(&self, payload: &[u8]) -> Result<Vec<Value>> {
        Ok(self.decode_raw(payload)?.into_iter().map(T::into_value).collect())
    }
}
