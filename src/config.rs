//! 写端配置
//!
//! ```toml
//! block_size = 1000
//!
//! [[columns]]
//! name = "ts"
//! type = "delta_long"
//!
//! [[columns]]
//! name = "url"
//! type = "text255"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::common::{CodecError, Result};
use crate::encoding::MAX_BLOCK_ROWS;
use crate::field_type::ColumnSchema;

pub const DEFAULT_BLOCK_SIZE: usize = 1000;

fn default_block_size() -> usize { DEFAULT_BLOCK_SIZE }

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompressorConfig {
    /// 每块的行数阈值
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    pub columns:    Vec<ColumnSchema>,
}

impl CompressorConfig {
    pub fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { block_size: DEFAULT_BLOCK_SIZE, columns }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size; self
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| CodecError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| CodecError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// 列类型是否已实现由编码器工厂检查
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_ROWS {
            return Err(CodecError::Config(format!(
                "block_size must be in 1..={MAX_BLOCK_ROWS}, got {}",
                self.block_size
            )));
        }
        if self.columns.is_empty() {
            return Err(CodecError::Config("at least one column is required".into()));
        }
        Ok(())
    }
}
