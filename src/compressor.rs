//! 行 → 列块写入器
//!
//! 多个线程可以同时 `write`；行先进入无界无锁队列，再由持有 flush 锁的
//! 唯一线程按 `block_size` 分批取出、推入各列编码器并写出一个块：
//!
//! ```text
//!   write() ──► SegQueue<R> ──► [flush 锁] ─► encoders × N ─► BlockHeader + 列块 ─► sink
//! ```
//!
//! - `write` 触发的 flush 使用 `try_lock`：锁被占用时直接返回 false，行留在队列里，
//!   因此队列长度可能暂时超过 `block_size`。
//! - `flush` 阻塞获取锁，然后把队列完全排空（包括最后不足一块的部分）。
//! - 编码器与 sink 只在锁内被修改，一个块的字节总是连续写出。

use std::io::Write;
use std::sync::Arc;

use crossbeam::queue::SegQueue;
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::common::{CodecError, Result};
use crate::config::CompressorConfig;
use crate::encoding::{create_encoder, ColumnEncoder, MAX_BLOCK_ROWS};
use crate::field_type::ColumnSchema;
use crate::header::BlockHeader;
use crate::row::Row;
use crate::value_codec::{BincodeValueCodec, ValueCodec};

/// flush 锁保护的全部可变状态
struct FlushState<W> {
    encoders:       Vec<Box<dyn ColumnEncoder>>,
    sink:           W,
    blocks_written: u64,
}

pub struct RowCompressor<R, W> {
    schema:     Vec<ColumnSchema>,
    block_size: usize,
    row_buffer: SegQueue<R>,
    state:      Mutex<FlushState<W>>,
}

impl<R: Row, W: Write + Send> RowCompressor<R, W> {
    pub fn new(schema: Vec<ColumnSchema>, block_size: usize, sink: W) -> Result<Self> {
        Self::with_codec(schema, block_size, sink, Arc::new(BincodeValueCodec))
    }

    pub fn from_config(config: &CompressorConfig, sink: W) -> Result<Self> {
        config.validate()?;
        Self::new(config.columns.clone(), config.block_size, sink)
    }

    /// 列类型无编码器（保留 id）属于配置错误，在构造时立即返回
    pub fn with_codec(
        schema:     Vec<ColumnSchema>,
        block_size: usize,
        sink:       W,
        codec:      Arc<dyn ValueCodec>,
    ) -> Result<Self> {
        if block_size == 0 || block_size > MAX_BLOCK_ROWS {
            return Err(CodecError::Config(format!(
                "block_size must be in 1..={MAX_BLOCK_ROWS}, got {block_size}"
            )));
        }
        let encoders = schema.iter()
            .map(|col| create_encoder(col, codec.clone()))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| {
                error!(error = %e, "cannot build column encoders");
                e
            })?;

        Ok(Self {
            schema,
            block_size,
            row_buffer: SegQueue::new(),
            state: Mutex::new(FlushState { encoders, sink, blocks_written: 0 }),
        })
    }

    /// 缓冲一行，达到阈值时尝试非阻塞 flush。返回本次调用是否写出了块。
    /// `None` 为空操作，返回 false。
    pub fn write(&self, row: impl Into<Option<R>>) -> Result<bool> {
        match row.into() {
            Some(row) => {
                self.row_buffer.push(row);
                self.maybe_flush()
            }
            None => Ok(false),
        }
    }

    pub fn write_all<I: IntoIterator<Item = R>>(&self, rows: I) -> Result<bool> {
        for row in rows {
            self.row_buffer.push(row);
        }
        self.maybe_flush()
    }

    /// 阻塞直到获得 flush 锁，然后排空队列并 flush sink
    pub fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        while !self.row_buffer.is_empty() {
            self.single_flush(&mut state)?;
        }
        state.sink.flush()?;
        Ok(())
    }

    /// 排空后交还 sink
    pub fn into_inner(self) -> Result<W> {
        self.flush()?;
        Ok(self.state.into_inner().sink)
    }

    pub fn schema(&self)        -> &[ColumnSchema] { &self.schema }
    pub fn block_size(&self)    -> usize           { self.block_size }
    pub fn buffered_rows(&self) -> usize           { self.row_buffer.len() }

    /// 阻塞读取已写出的块数
    pub fn blocks_written(&self) -> u64 {
        self.state.lock().blocks_written
    }

    fn maybe_flush(&self) -> Result<bool> {
        if self.row_buffer.len() < self.block_size {
            return Ok(false);
        }
        let Some(mut state) = self.state.try_lock() else {
            return Ok(false);
        };
        let mut flushed = false;
        while self.row_buffer.len() >= self.block_size {
            self.single_flush(&mut state)?;
            flushed = true;
        }
        Ok(flushed)
    }

    /// 取出至多 `block_size` 行写成一个块。调用方必须持有 flush 锁。
    fn single_flush(&self, state: &mut FlushState<W>) -> Result<()> {
        let mut rows = Vec::with_capacity(self.block_size.min(self.row_buffer.len()));
        while rows.len() < self.block_size {
            match self.row_buffer.pop() {
                Some(row) => rows.push(row),
                None      => break,
            }
        }
        if rows.is_empty() {
            return Ok(());
        }

        let columns = match Self::encode_batch(&mut state.encoders, &rows) {
            Ok(columns) => columns,
            Err(e) => {
                // 批次作废，编码器回到初始状态，下一个块不受影响
                for enc in state.encoders.iter_mut() {
                    enc.reset();
                }
                error!(rows = rows.len(), error = %e, "dropping block after encode failure");
                return Err(e);
            }
        };

        let total: usize = columns.iter().map(Vec::len).sum();
        let length = u32::try_from(total)
            .map_err(|_| CodecError::Corrupt(format!("block payload too large: {total}")))?;

        // 块头在前，列块按 schema 顺序紧随其后
        let mut block = Vec::with_capacity(total + 64);
        BlockHeader::new(length, self.schema.clone()).write(&mut block)?;
        for col in &columns {
            block.extend_from_slice(col);
        }
        state.sink.write_all(&block)?;
        state.blocks_written += 1;

        debug!(
            rows   = rows.len(),
            bytes  = block.len(),
            block  = state.blocks_written,
            "wrote column block"
        );
        Ok(())
    }

    fn encode_batch(encoders: &mut [Box<dyn ColumnEncoder>], rows: &[R]) -> Result<Vec<Vec<u8>>> {
        for row in rows {
            for enc in encoders.iter_mut() {
                let value = row.get(enc.name());
                enc.push(value)?;
            }
        }
        encoders.iter_mut().map(|enc| enc.flush()).collect()
    }
}
