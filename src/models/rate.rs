use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 承运商报价
///
/// 只在产生它的那次询价内有效，服务端会让其过期。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateQuote {
    /// 远端报价 ID（Shippo `object_id`）
    pub rate_id: String,
    pub provider: String,
    pub service_level: String,
    #[serde(default)]
    pub service_token: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub estimated_days: Option<u32>,
}

impl RateQuote {
    /// (provider, service level) 是否与目标完全一致
    pub fn matches(&self, provider: &str, service_level: &str) -> bool {
        self.provider == provider && self.service_level == service_level
    }
}

impl fmt::Display for RateQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.provider, self.service_level, self.amount, self.currency
        )
    }
}

/// 面单文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LabelFileType {
    /// 标准页面
    #[default]
    #[serde(rename = "PDF")]
    Pdf,
    /// 4×6 热敏打印机
    #[serde(rename = "PDF_4x6")]
    Pdf4x6,
    #[serde(rename = "PDF_4x8")]
    Pdf4x8,
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "ZPLII")]
    Zplii,
}

impl LabelFileType {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelFileType::Pdf => "PDF",
            LabelFileType::Pdf4x6 => "PDF_4x6",
            LabelFileType::Pdf4x8 => "PDF_4x8",
            LabelFileType::Png => "PNG",
            LabelFileType::Zplii => "ZPLII",
        }
    }

    /// 本地保存时的扩展名
    pub fn extension(self) -> &'static str {
        match self {
            LabelFileType::Pdf | LabelFileType::Pdf4x6 | LabelFileType::Pdf4x8 => "pdf",
            LabelFileType::Png => "png",
            LabelFileType::Zplii => "zpl",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PDF" => Some(LabelFileType::Pdf),
            "PDF_4X6" => Some(LabelFileType::Pdf4x6),
            "PDF_4X8" => Some(LabelFileType::Pdf4x8),
            "PNG" => Some(LabelFileType::Png),
            "ZPLII" => Some(LabelFileType::Zplii),
            _ => None,
        }
    }
}

/// 购买面单的结果
///
/// 没有"处理中"状态：非即时成功一律视为失败。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelTransaction {
    Purchased {
        tracking_number: String,
        label_url: String,
    },
    Failed {
        /// 远端返回的原始状态
        status: String,
        /// 服务端消息，原样保留
        messages: Vec<String>,
    },
}

impl LabelTransaction {
    pub fn is_purchased(&self) -> bool {
        matches!(self, LabelTransaction::Purchased { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_file_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&LabelFileType::Pdf4x6).unwrap(),
            "\"PDF_4x6\""
        );
        assert_eq!(LabelFileType::parse("pdf_4x6"), Some(LabelFileType::Pdf4x6));
        assert_eq!(LabelFileType::Zplii.extension(), "zpl");
        assert_eq!(LabelFileType::default(), LabelFileType::Pdf);
    }
}
