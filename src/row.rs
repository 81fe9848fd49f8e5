//! 行抽象
//!
//! 编解码器只通过字段名读写行的值，从不修改行的结构。
//! `Record` 是默认实现；调用方可以用自己的行类型实现 `Row` / `RowFactory`。

use std::collections::HashMap;

use crate::field_type::Value;

pub trait Row: Send {
    /// 字段不存在返回 None；`Some(Value::Null)` 与 None 等价
    fn get(&self, field: &str) -> Option<&Value>;
    fn set(&mut self, field: &str, value: Value);
}

/// 读端为每个解码出的行创建空实例
pub trait RowFactory {
    type Row: Row;
    fn create(&self) -> Self::Row;
}

// ── Record ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self { Self::default() }

    /// 链式构造：`Record::new().with("id", 1)`
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn len(&self)      -> usize { self.fields.len() }
    pub fn is_empty(&self) -> bool  { self.fields.is_empty() }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl Row for Record {
    fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn set(&mut self, field: &str, value: Value) {
        self.fields.insert(field.into(), value);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFactory;

impl RowFactory for RecordFactory {
    type Row = Record;
    fn create(&self) -> Record { Record::new() }
}
