//! 面单购买服务 - 业务能力层
//!
//! 只负责"买下一个报价"。这是对承运商账户的扣费操作：
//! 同一个报价最多提交一次，失败后不重试。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::clients::ShippingGateway;
use crate::error::{ServiceFailure, ShipmentError};
use crate::models::{LabelFileType, LabelTransaction, RateQuote};

/// 面单购买服务
pub struct LabelPurchaser {
    gateway: Arc<dyn ShippingGateway>,
    file_type: LabelFileType,
    timeout: Duration,
    /// 已提交过购买的报价 ID，生命周期与本服务相同（一次运行）
    submitted: Mutex<HashSet<String>>,
}

impl LabelPurchaser {
    pub fn new(gateway: Arc<dyn ShippingGateway>, file_type: LabelFileType, timeout: Duration) -> Self {
        Self {
            gateway,
            file_type,
            timeout,
            submitted: Mutex::new(HashSet::new()),
        }
    }

    pub fn file_type(&self) -> LabelFileType {
        self.file_type
    }

    /// 购买报价
    ///
    /// # 返回
    /// - `Ok(LabelTransaction::Purchased)`：仅当远端状态为 `SUCCESS`
    /// - `Ok(LabelTransaction::Failed)`：其他任何状态，消息原样保留
    /// - `Ok(LabelTransaction::Failed)`：超时或通信失败，是否已扣费未知，状态为 `TIMEOUT` / `UNKNOWN`
    /// - `Err(DuplicatePurchase)`：该报价已提交过
    /// - `Err(Service)`：仅凭证被拒，此时确定未扣费
    pub async fn purchase(&self, rate: &RateQuote) -> Result<LabelTransaction, ShipmentError> {
        self.claim(&rate.rate_id)?;

        debug!(
            "购买报价 {} ({}), 面单格式 {}",
            rate.rate_id,
            rate,
            self.file_type.as_str()
        );

        match timeout(self.timeout, self.gateway.purchase_label(rate, self.file_type)).await {
            Ok(Err(ShipmentError::Service { cause, .. }))
                if !matches!(cause, ServiceFailure::Unauthorized { .. }) =>
            {
                let status = match cause {
                    ServiceFailure::Timeout { .. } => "TIMEOUT",
                    _ => "UNKNOWN",
                };
                warn!(
                    "⚠️ 购买报价 {} 通信失败，结果未知，不会重试: {}",
                    rate.rate_id, cause
                );
                Ok(LabelTransaction::Failed {
                    status: status.to_string(),
                    messages: vec![format!(
                        "{}; purchase outcome unknown, check the carrier account before resubmitting",
                        cause
                    )],
                })
            }
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "⚠️ 购买报价 {} 在 {}s 内无响应，结果未知，不会重试",
                    rate.rate_id,
                    self.timeout.as_secs()
                );
                Ok(LabelTransaction::Failed {
                    status: "TIMEOUT".to_string(),
                    messages: vec![format!(
                        "no response within {}s; purchase outcome unknown, check the carrier account before resubmitting",
                        self.timeout.as_secs()
                    )],
                })
            }
        }
    }

    /// 登记报价 ID；已登记过则拒绝
    fn claim(&self, rate_id: &str) -> Result<(), ShipmentError> {
        let mut submitted = self.submitted.lock().unwrap_or_else(|e| e.into_inner());
        if !submitted.insert(rate_id.to_string()) {
            return Err(ShipmentError::DuplicatePurchase {
                rate_id: rate_id.to_string(),
            });
        }
        Ok(())
    }
}

/// 把非成功的购买结果转为错误
pub fn require_purchased(
    rate: &RateQuote,
    transaction: LabelTransaction,
) -> Result<(String, String), ShipmentError> {
    match transaction {
        LabelTransaction::Purchased {
            tracking_number,
            label_url,
        } => Ok((tracking_number, label_url)),
        LabelTransaction::Failed { status, messages } => Err(ShipmentError::PurchaseFailed {
            rate_id: rate.rate_id.clone(),
            status,
            messages,
        }),
    }
}
