//! 外部服务客户端
//!
//! - `ShippingGateway`：询价 + 购买（同一个运价服务）
//! - `LabelHost`：面单文件所在的第二个远端

pub mod label_host;
pub mod shippo_client;

use async_trait::async_trait;

use crate::error::ShipmentError;
use crate::models::{LabelFileType, LabelTransaction, RateQuote, ShipmentRequest};

pub use label_host::{HttpLabelHost, LabelFetchError};
pub use shippo_client::ShippoClient;

/// 运价比价 / 面单购买服务
#[async_trait]
pub trait ShippingGateway: Send + Sync {
    /// 一次请求提交发件人、收件人与包裹，返回服务端给出的全部报价（保持原顺序）
    async fn request_rates(&self, request: &ShipmentRequest)
        -> Result<Vec<RateQuote>, ShipmentError>;

    /// 购买指定报价；这是一次扣费操作
    async fn purchase_label(
        &self,
        rate: &RateQuote,
        file_type: LabelFileType,
    ) -> Result<LabelTransaction, ShipmentError>;
}

/// 面单文件托管方
#[async_trait]
pub trait LabelHost: Send + Sync {
    /// GET 面单文件，返回原始字节
    async fn fetch_label(&self, url: &str) -> Result<Vec<u8>, LabelFetchError>;
}
