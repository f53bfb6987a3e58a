use serde::{Deserialize, Serialize};

/// 收发件地址
///
/// 可选字段用空字符串而非 `None` 表示，序列化后每个地址的键集合相同
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub street1: String,
    #[serde(default)]
    pub street2: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub zip: String,
    /// ISO 3166-1 alpha-2
    pub country: String,
}

impl Address {
    /// 返回违反地址不变量的字段名（street1 / city / zip / country 必填）
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("street1", &self.street1),
            ("city", &self.city),
            ("zip", &self.zip),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.missing_required().is_empty()
    }
}
