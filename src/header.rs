//! 块头与列头
//!
//! ```text
//! BlockHeader
//! ┌──────────────────────────────────────┐
//! │ version        (u8)                  │
//! │ total_payload  (u32 BE)              │  所有列块（含列头）的字节总数
//! │ column_count   (u32 BE)              │
//! │ column_count × │ name (varint len + UTF-8)
//! │                │ type_id (u32 BE)    │
//! └──────────────────────────────────────┘
//!
//! ColumnHeader（固定 9 字节）
//! ┌──────────────────────────────────────┐
//! │ version        (u8)                  │
//! │ type_id        (u32 BE)              │
//! │ payload_len    (u32 BE)              │
//! └──────────────────────────────────────┘
//! ```

use std::io::{ErrorKind, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::common::{CodecError, ColumnType, Result, FORMAT_VERSION};
use crate::field_type::ColumnSchema;
use crate::varint;

pub const COLUMN_HEADER_SIZE: usize = 9;

// ── ColumnHeader ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnHeader {
    pub version:     u8,
    pub column_type: ColumnType,
    pub length:      u32,
}

impl ColumnHeader {
    pub fn new(column_type: ColumnType, length: u32) -> Self {
        Self { version: FORMAT_VERSION, column_type, length }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(self.version);
        out.extend_from_slice(&self.column_type.id().to_be_bytes());
        out.extend_from_slice(&self.length.to_be_bytes());
    }

    pub fn read<R: Read + ?Sized>(input: &mut R) -> Result<Self> {
        let version     = input.read_u8()?;
        let column_type = ColumnType::from_id(input.read_u32::<BigEndian>()?)?;
        let length      = input.read_u32::<BigEndian>()?;
        Ok(Self { version, column_type, length })
    }
}

/// 给编码器产出的 payload 加上 9 字节列头
pub fn frame_column(column_type: ColumnType, payload: &[u8]) -> Result<Vec<u8>> {
    let length = u32::try_from(payload.len())
        .map_err(|_| CodecError::Corrupt(format!("column payload too large: {}", payload.len())))?;
    let mut out = Vec::with_capacity(COLUMN_HEADER_SIZE + payload.len());
    ColumnHeader::new(column_type, length).write_to(&mut out);
    out.extend_from_slice(payload);
    Ok(out)
}

// ── BlockHeader ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: u8,
    /// 列块总字节数，不是行数；读端不依赖它
    pub length:  u32,
    pub columns: Vec<ColumnSchema>,
}

impl BlockHeader {
    pub fn new(length: u32, columns: Vec<ColumnSchema>) -> Self {
        Self { version: FORMAT_VERSION, length, columns }
    }

    pub fn write<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let mut buf = Vec::new();
        buf.push(self.version);
        buf.extend_from_slice(&self.length.to_be_bytes());
        buf.extend_from_slice(&(self.columns.len() as u32).to_be_bytes());
        for col in &self.columns {
            varint::write_chunk(&mut buf, col.name.as_bytes());
            buf.write_u32::<BigEndian>(col.column_type.id())?;
        }
        out.write_all(&buf)?;
        Ok(())
    }

    /// 在块边界干净地遇到流末尾时返回 `Ok(None)`；
    /// 块头读到一半就结束属于 I/O 错误
    pub fn read<R: Read + ?Sized>(input: &mut R) -> Result<Option<Self>> {
        let version = match read_first_byte(input)? {
            Some(b) => b,
            None    => return Ok(None),
        };
        let length    = input.read_u32::<BigEndian>()?;
        let num_cols  = input.read_u32::<BigEndian>()? as usize;
        let mut columns = Vec::with_capacity(num_cols.min(1024));
        for index in 0..num_cols {
            let name = String::from_utf8(varint::read_chunk(input)?)
                .map_err(|_| CodecError::InvalidFieldName { index })?;
            let column_type = ColumnType::from_id(input.read_u32::<BigEndian>()?)?;
            columns.push(ColumnSchema { name, column_type });
        }
        Ok(Some(Self { version, length, columns }))
    }
}

fn read_first_byte<R: Read + ?Sized>(input: &mut R) -> Result<Option<u8>> {
    let mut b = [0u8; 1];
    loop {
        match input.read(&mut b) {
            Ok(0)  => return Ok(None),
            Ok(_)  => return Ok(Some(b[0])),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
