//! 询价服务 - 业务能力层
//!
//! 只负责"一票运单拿到报价列表"，不重试、不排序

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::clients::ShippingGateway;
use crate::error::{ServiceFailure, ShipmentError};
use crate::models::{RateQuote, ShipmentRequest};

/// 询价服务
pub struct RateRequester {
    gateway: Arc<dyn ShippingGateway>,
    timeout: Duration,
}

impl RateRequester {
    /// # 参数
    /// - `gateway`: 运价服务
    /// - `timeout`: 整次询价的上限，超时按服务错误处理
    pub fn new(gateway: Arc<dyn ShippingGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    /// 提交发件人、收件人与包裹，返回服务端顺序的报价列表
    ///
    /// 失败直接返回 `ShipmentError::Service`，是否继续由编排层决定
    pub async fn request(&self, request: &ShipmentRequest) -> Result<Vec<RateQuote>, ShipmentError> {
        debug!(
            "询价: {} {} → {} {}",
            request.origin().city,
            request.origin().zip,
            request.destination().city,
            request.destination().zip
        );

        let quotes = timeout(self.timeout, self.gateway.request_rates(request))
            .await
            .map_err(|_| {
                ShipmentError::service(
                    "shipments",
                    ServiceFailure::Timeout {
                        secs: self.timeout.as_secs(),
                    },
                )
            })??;

        for (i, quote) in quotes.iter().enumerate() {
            debug!("  报价 {}: {} ({})", i + 1, quote, quote.rate_id);
        }

        Ok(quotes)
    }
}
