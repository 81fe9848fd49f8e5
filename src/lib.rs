//! # colcodec
//!
//! 行 → 列转码编解码器：把一串具名字段的行按固定行数分批，
//! 每个字段连续存放并按列选择编码，产出自描述的二进制块流；
//! 读端逆向还原，并可只解码指定字段。
//!
//! ## 整体架构
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      RowCompressor                        │
//! │   write() ─► SegQueue ─► [flush 锁] ─► ColumnEncoder × N   │
//! │                                         ├─ Raw            │
//! │                                         ├─ DeltaInt/Long  │
//! │                                         ├─ Text255        │
//! │                                         └─ RunLength      │
//! │            BlockHeader(schema) + ColumnHeader + payload    │
//! └────────────────────────────┬─────────────────────────────┘
//!                              │  字节流
//! ┌────────────────────────────▼─────────────────────────────┐
//! │  BlockReader ─ 解析块头 → 逐列：跳过 / ColumnDecoder       │
//! │  RowReader   ─ EMPTY → FILLING → READY → … → DONE          │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod common;
pub mod config;
pub mod field_type;
pub mod row;
pub mod value_codec;
pub mod varint;

pub mod encoding;
pub mod header;
pub mod compressor;
pub mod reader;

pub use common::{CodecError, ColumnType, Result};
pub use compressor::RowCompressor;
pub use config::CompressorConfig;
pub use field_type::{ColumnSchema, Value};
pub use reader::{Block, BlockReader, ReadState, RowReader};
pub use row::{Record, RecordFactory, Row, RowFactory};
pub use value_codec::{BincodeValueCodec, ValueCodec};
