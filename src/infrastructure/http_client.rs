//! HTTP 客户端 - 基础设施层
//!
//! 持有 reqwest 连接池，只暴露"带超时的 HTTP 客户端"能力

use crate::error::{AppError, AppResult};
use std::time::Duration;

const USER_AGENT: &str = concat!("bulk_labels/", env!("CARGO_PKG_VERSION"));

/// 创建带整体超时的 HTTP 客户端
///
/// # 参数
/// - `timeout`: 单个请求（连接 + 读完响应体）的上限
pub fn build_http_client(timeout: Duration) -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(AppError::HttpClient)
}

/// 截断响应体用于错误信息
pub fn truncate_body(body: &str, max_len: usize) -> String {
    crate::utils::logging::truncate_text(body.trim(), max_len)
}
