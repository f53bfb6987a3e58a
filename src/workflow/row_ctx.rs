//! 运单行处理上下文
//!
//! 封装"我正在处理第几行、收件人是谁"这一信息

use std::fmt::Display;

/// 运单行处理上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCtx {
    /// 行在批次中的下标（从0开始）
    pub row_index: usize,

    /// 收件人姓名（仅用于日志和错误信息）
    pub recipient_name: Option<String>,
}

impl RowCtx {
    pub fn new(row_index: usize, recipient_name: Option<String>) -> Self {
        Self {
            row_index,
            recipient_name,
        }
    }

    /// 行号（从1开始）
    pub fn row_number(&self) -> usize {
        self.row_index + 1
    }

    /// 日志前缀
    pub fn tag(&self) -> String {
        format!("[第 {} 行]", self.row_number())
    }
}

impl Display for RowCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.recipient_name {
            Some(name) => write!(f, "row {} ({})", self.row_number(), name),
            None => write!(f, "row {}", self.row_number()),
        }
    }
}
