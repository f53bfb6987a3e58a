use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::address::Address;
use crate::models::parcel::Parcel;

/// 原始单元格值（表格读取方可能给出文本或数字）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl RawValue {
    /// 转为去除首尾空白的文本；整数值的浮点数不带小数部分
    pub fn to_text(&self) -> String {
        match self {
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
            RawValue::Float(f) => f.to_string(),
            RawValue::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

/// 一行原始输入（列名 → 值）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(BTreeMap<String, RawValue>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.0.remove(field)
    }

    /// 取字段文本；缺失或空白返回 `None`
    pub fn text(&self, field: &str) -> Option<String> {
        self.0
            .get(field)
            .map(RawValue::to_text)
            .filter(|s| !s.is_empty())
    }

    /// 取字段文本；缺失或空白返回空字符串
    pub fn text_or_empty(&self, field: &str) -> String {
        self.text(field).unwrap_or_default()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 一票运单请求：发件地址 + 收件地址 + 包裹
///
/// 每行输入构造一次，构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipmentRequest {
    origin: Address,
    destination: Address,
    parcel: Parcel,
}

impl ShipmentRequest {
    pub fn new(origin: Address, destination: Address, parcel: Parcel) -> Self {
        Self {
            origin,
            destination,
            parcel,
        }
    }

    pub fn origin(&self) -> &Address {
        &self.origin
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn parcel(&self) -> &Parcel {
        &self.parcel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_to_text() {
        assert_eq!(RawValue::Text("  10007 ".into()).to_text(), "10007");
        assert_eq!(RawValue::Integer(2).to_text(), "2");
        assert_eq!(RawValue::Float(94117.0).to_text(), "94117");
        assert_eq!(RawValue::Float(2.5).to_text(), "2.5");
    }

    #[test]
    fn test_blank_text_is_absent() {
        let row = RawRow::new().with("city", "   ").with("zip", "10007");
        assert_eq!(row.text("city"), None);
        assert_eq!(row.text("missing"), None);
        assert_eq!(row.text_or_empty("city"), "");
        assert_eq!(row.text("zip").as_deref(), Some("10007"));
    }
}
