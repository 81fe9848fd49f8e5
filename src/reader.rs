//! 列块读取
//!
//! - `BlockReader`：逐块解析，错误完整返回给调用方。
//! - `RowReader`：在其上构建的惰性行迭代器。只在内部缓冲为空时才解析下一块；
//!   除块边界上的干净 EOF 外，任何错误都会被记录日志并使迭代停止（DONE），
//!   之前已缓冲的行仍可取出，可用 `error()` / `stopped_early()` 检查。
//!
//! ```text
//!   EMPTY ──► FILLING ──► READY ──► EMPTY ──► …
//!                 │
//!                 └── EOF / 错误 ──► DONE
//! ```

use std::collections::{HashSet, VecDeque};
use std::io::{self, Read};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::common::{CodecError, Result};
use crate::encoding::create_decoder;
use crate::field_type::{ColumnSchema, Value};
use crate::header::{BlockHeader, ColumnHeader};
use crate::row::{RecordFactory, Row, RowFactory};
use crate::value_codec::{BincodeValueCodec, ValueCodec};
use crate::varint;

/// 空集合等价于不过滤
fn field_filter<I, S>(fields: I) -> Option<HashSet<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let set: HashSet<String> = fields.into_iter().map(|s| s.as_ref().to_owned()).collect();
    (!set.is_empty()).then_some(set)
}

// ── Block ─────────────────────────────────────────────────────────────────────

/// 一个解析完成的块；只包含未被过滤掉的列
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub header:  BlockHeader,
    pub columns: Vec<(ColumnSchema, Vec<Value>)>,
}

impl Block {
    /// 由第一个解码的列决定；所有列都被跳过时为 0
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|(_, v)| v.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.iter()
            .find(|(schema, _)| schema.name == name)
            .map(|(_, values)| values.as_slice())
    }
}

// ── BlockReader ───────────────────────────────────────────────────────────────

pub struct BlockReader<R> {
    input:  R,
    filter: Option<HashSet<String>>,
    codec:  Arc<dyn ValueCodec>,
}

impl<R: Read> BlockReader<R> {
    pub fn new<I, S>(input: R, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_codec(input, fields, Arc::new(BincodeValueCodec))
    }

    pub fn with_codec<I, S>(input: R, fields: I, codec: Arc<dyn ValueCodec>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { input, filter: field_filter(fields), codec }
    }

    pub fn wants(&self, field: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.contains(field))
    }

    /// 读取下一块；流在块边界结束时返回 `Ok(None)`
    pub fn read_block(&mut self) -> Result<Option<Block>> {
        let Some(header) = BlockHeader::read(&mut self.input)? else {
            return Ok(None);
        };

        let mut columns  = Vec::new();
        let mut expected = None;

        for schema in &header.columns {
            let col = ColumnHeader::read(&mut self.input)?;
            if col.column_type != schema.column_type {
                return Err(CodecError::Corrupt(format!(
                    "column `{}` declared as {} in block header but framed as {}",
                    schema.name, schema.column_type, col.column_type
                )));
            }

            if !self.wants(&schema.name) {
                self.skip(&schema.name, col.length as u64)?;
                trace!(column = %schema.name, bytes = col.length, "skipped column");
                continue;
            }

            let payload = varint::read_exact_len(&mut self.input, col.length as u64)?;
            let values = create_decoder(col.column_type, self.codec.clone())?.decode(&payload)?;

            match expected {
                None => expected = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(CodecError::ColumnCountMismatch {
                        column:   schema.name.clone(),
                        expected: n,
                        actual:   values.len(),
                    });
                }
                Some(_) => {}
            }
            columns.push((schema.clone(), values));
        }

        Ok(Some(Block { header, columns }))
    }

    /// 跳过恰好 `len` 字节；流不再前进时报错，不会死循环
    fn skip(&mut self, column: &str, len: u64) -> Result<()> {
        let mut remaining = len;
        while remaining > 0 {
            let skipped = io::copy(&mut (&mut self.input).take(remaining), &mut io::sink())?;
            if skipped == 0 {
                return Err(CodecError::SkipUnderflow { column: column.into(), remaining });
            }
            remaining -= skipped;
        }
        Ok(())
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}

// ── RowReader ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Empty,
    Filling,
    Ready,
    Done,
}

pub struct RowReader<R, F: RowFactory = RecordFactory> {
    blocks:  BlockReader<R>,
    factory: F,
    buffer:  VecDeque<F::Row>,
    state:   ReadState,
    error:   Option<CodecError>,
}

impl<R: Read> RowReader<R, RecordFactory> {
    /// `fields` 为空时读取全部字段
    pub fn new<I, S>(input: R, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_factory(input, fields, RecordFactory)
    }

    pub fn unfiltered(input: R) -> Self {
        Self::new(input, std::iter::empty::<&str>())
    }
}

impl<R: Read, F: RowFactory> RowReader<R, F> {
    pub fn with_factory<I, S>(input: R, fields: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_blocks(BlockReader::new(input, fields), factory)
    }

    pub fn from_blocks(blocks: BlockReader<R>, factory: F) -> Self {
        Self {
            blocks,
            factory,
            buffer: VecDeque::new(),
            state:  ReadState::Empty,
            error:  None,
        }
    }

    pub fn state(&self) -> ReadState { self.state }

    /// 导致迭代提前停止的错误（干净 EOF 时为 None）
    pub fn error(&self) -> Option<&CodecError> { self.error.as_ref() }

    pub fn stopped_early(&self) -> bool { self.error.is_some() }

    pub fn has_next(&mut self) -> bool {
        if self.buffer.is_empty() {
            self.fill();
        }
        !self.buffer.is_empty()
    }

    /// 释放底层流
    pub fn close(self) {
        drop(self.into_inner());
    }

    pub fn into_inner(self) -> R {
        self.blocks.into_inner()
    }

    /// 解析块直到得到至少一行、流结束或出错。
    /// 全部列都被过滤掉的块不产生行，继续读下一块。
    fn fill(&mut self) {
        while self.buffer.is_empty() && self.state != ReadState::Done {
            self.state = ReadState::Filling;
            match self.blocks.read_block() {
                Ok(Some(block)) => {
                    let rows = self.assemble(block);
                    self.buffer.extend(rows);
                    self.state = if self.buffer.is_empty() { ReadState::Empty } else { ReadState::Ready };
                }
                Ok(None) => {
                    debug!("end of column stream");
                    self.state = ReadState::Done;
                }
                Err(e) => {
                    error!(error = %e, buffered = self.buffer.len(), "failed reading column block, stopping");
                    self.error = Some(e);
                    self.state = ReadState::Done;
                }
            }
        }
    }

    /// 按位置把各列的值对齐到同一批行实例上
    fn assemble(&self, block: Block) -> Vec<F::Row> {
        let mut rows: Vec<F::Row> = (0..block.num_rows()).map(|_| self.factory.create()).collect();
        for (schema, values) in block.columns {
            for (row, value) in rows.iter_mut().zip(values) {
                row.set(&schema.name, value);
            }
        }
        rows
    }
}

impl<R: Read, F: RowFactory> Iterator for RowReader<R, F> {
    type Item = F::Row;

    fn next(&mut self) -> Option<F::Row> {
        if self.buffer.is_empty() {
            self.fill();
        }
        let row = self.buffer.pop_front();
        if self.buffer.is_empty() && self.state == ReadState::Ready {
            self.state = ReadState::Empty;
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ColumnType, FORMAT_VERSION};
    use crate::compressor::RowCompressor;
    use crate::row::Record;
    use test_log::test;

    fn abc_stream(rows: i32, block_size: usize) -> Vec<u8> {
        let schema = vec![
            ColumnSchema::delta_long("a"),
            ColumnSchema::raw("b"),
            ColumnSchema::text255("c"),
        ];
        let c = RowCompressor::<Record, _>::new(schema, block_size, Vec::new()).unwrap();
        for i in 0..rows {
            c.write(
                Record::new()
                    .with("a", i as i64 * 10)
                    .with("b", format!("b{i}"))
                    .with("c", if i % 2 == 0 { "even" } else { "odd" }),
            )
            .unwrap();
        }
        c.into_inner().unwrap()
    }

    #[test]
    fn reads_all_blocks_in_order() {
        let rows: Vec<Record> = RowReader::unfiltered(abc_stream(10, 3).as_slice()).collect();
        assert_eq!(rows.len(), 10);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.get("a"), Some(&Value::Int64(i as i64 * 10)));
            assert_eq!(row.get("b"), Some(&Value::Text(format!("b{i}"))));
        }
    }

    #[test]
    fn pruned_read_matches_full_read() {
        let bytes = abc_stream(7, 4);
        let full: Vec<Record>   = RowReader::unfiltered(bytes.as_slice()).collect();
        let pruned: Vec<Record> = RowReader::new(bytes.as_slice(), ["a", "c"]).collect();
        assert_eq!(pruned.len(), full.len());
        for (p, f) in pruned.iter().zip(&full) {
            assert_eq!(p.len(), 2);
            assert_eq!(p.get("b"), None);
            assert_eq!(p.get("a"), f.get("a"));
            assert_eq!(p.get("c"), f.get("c"));
        }
    }

    #[test]
    fn filter_matching_no_columns_ends_cleanly() {
        let bytes = abc_stream(5, 5);
        let mut reader = RowReader::new(bytes.as_slice(), ["zzz"]);
        assert!(!reader.has_next());
        assert_eq!(reader.state(), ReadState::Done);
        assert!(!reader.stopped_early());
    }

    #[test]
    fn state_machine_walks_blocks() {
        let bytes = abc_stream(4, 2);
        let mut reader = RowReader::unfiltered(bytes.as_slice());
        assert_eq!(reader.state(), ReadState::Empty);
        assert!(reader.has_next());
        assert_eq!(reader.state(), ReadState::Ready);
        reader.next();
        reader.next();
        assert_eq!(reader.state(), ReadState::Empty);
        assert_eq!(reader.by_ref().count(), 2);
        assert!(reader.next().is_none());
        assert_eq!(reader.state(), ReadState::Done);
        assert!(reader.error().is_none());
    }

    #[test]
    fn truncated_stream_keeps_buffered_rows_and_reports() {
        let mut bytes = abc_stream(6, 3);
        bytes.truncate(bytes.len() - 4);
        let mut reader = RowReader::unfiltered(bytes.as_slice());
        let rows: Vec<Record> = reader.by_ref().collect();
        assert_eq!(rows.len(), 3);
        assert!(reader.stopped_early());
        assert!(matches!(reader.error(), Some(CodecError::Io(_))));
    }

    #[test]
    fn skip_underflow_when_payload_is_missing() {
        let mut bytes = abc_stream(3, 3);
        // 截掉第二列 payload 的一部分以及之后的所有字节
        let header_len = {
            let mut cur = bytes.as_slice();
            BlockHeader::read(&mut cur).unwrap();
            bytes.len() - cur.len()
        };
        let a_len = {
            let mut cur = &bytes[header_len..];
            ColumnHeader::read(&mut cur).unwrap().length as usize
        };
        bytes.truncate(header_len + 9 + a_len + 9 + 2);

        let mut blocks = BlockReader::new(bytes.as_slice(), ["a"]);
        assert!(matches!(
            blocks.read_block(),
            Err(CodecError::SkipUnderflow { ref column, .. }) if column == "b"
        ));
    }

    #[test]
    fn column_count_mismatch_is_corrupt() {
        let mut bytes = Vec::new();
        BlockHeader::new(0, vec![ColumnSchema::delta_int("x"), ColumnSchema::delta_int("y")])
            .write(&mut bytes)
            .unwrap();
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 5, 0, 0, 0, 2, 2, 2]);
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 5, 0, 0, 0, 1, 2]);

        let mut blocks = BlockReader::new(bytes.as_slice(), std::iter::empty::<&str>());
        assert!(matches!(
            blocks.read_block(),
            Err(CodecError::ColumnCountMismatch { expected: 2, actual: 1, .. })
        ));

        // 只读其中一列时不存在对齐问题
        let mut blocks = BlockReader::new(bytes.as_slice(), ["y"]);
        let block = blocks.read_block().unwrap().unwrap();
        assert_eq!(block.num_rows(), 1);
        assert_eq!(block.column("y"), Some(&[Value::Int32(1)][..]));
    }

    #[test]
    fn reserved_column_fails_only_when_decoded() {
        let mut bytes = Vec::new();
        BlockHeader::new(0, vec![
            ColumnSchema::new("v", ColumnType::VariableLength),
            ColumnSchema::delta_int("x"),
        ])
        .write(&mut bytes)
        .unwrap();
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 1, 0, 0, 0, 2, 0xde, 0xad]);
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 5, 0, 0, 0, 1, 4]);

        let block = BlockReader::new(bytes.as_slice(), ["x"]).read_block().unwrap().unwrap();
        assert_eq!(block.column("x"), Some(&[Value::Int32(2)][..]));

        let mut reader = RowReader::unfiltered(bytes.as_slice());
        assert!(reader.next().is_none());
        assert!(matches!(
            reader.error(),
            Some(CodecError::Unimplemented(ColumnType::VariableLength))
        ));
    }

    #[test]
    fn huge_run_count_fails_as_corrupt_block() {
        let mut bytes = Vec::new();
        BlockHeader::new(15, vec![ColumnSchema::run_length("r")]).write(&mut bytes).unwrap();
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 3, 0, 0, 0, 6]);
        bytes.extend_from_slice(&[0xff, 0xff, 0xff, 0xff, 0x0f, 0x00]);

        let mut blocks = BlockReader::new(bytes.as_slice(), ["r"]);
        assert!(matches!(blocks.read_block(), Err(CodecError::Corrupt(_))));

        let mut reader = RowReader::unfiltered(bytes.as_slice());
        assert!(reader.next().is_none());
        assert_eq!(reader.state(), ReadState::Done);
        assert!(matches!(reader.error(), Some(CodecError::Corrupt(_))));
    }

    #[test]
    fn declared_payload_longer_than_stream_is_io_error() {
        let mut bytes = Vec::new();
        BlockHeader::new(0, vec![ColumnSchema::raw("v")]).write(&mut bytes).unwrap();
        // 声明 0xffffffff 字节，实际只有 3 字节
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 1, 2, 3]);
        assert!(matches!(
            BlockReader::new(bytes.as_slice(), ["v"]).read_block(),
            Err(CodecError::Io(ref e)) if e.kind() == io::ErrorKind::UnexpectedEof
        ));
    }

    #[test]
    fn type_mismatch_between_headers_is_corrupt() {
        let mut bytes = Vec::new();
        BlockHeader::new(0, vec![ColumnSchema::delta_int("x")]).write(&mut bytes).unwrap();
        bytes.extend_from_slice(&[FORMAT_VERSION, 0, 0, 0, 6, 0, 0, 0, 1, 4]);
        assert!(matches!(
            BlockReader::new(bytes.as_slice(), std::iter::empty::<&str>()).read_block(),
            Err(CodecError::Corrupt(_))
        ));
    }
}
