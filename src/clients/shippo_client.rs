/// Shippo API 客户端
///
/// 封装运单询价（`POST /shipments/`）与面单购买（`POST /transactions/`）
use crate::clients::ShippingGateway;
use crate::config::Config;
use crate::error::{AppResult, ServiceFailure, ShipmentError};
use crate::infrastructure::{build_http_client, truncate_body};
use crate::models::{Address, LabelFileType, LabelTransaction, Parcel, RateQuote, ShipmentRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// 购买成功的唯一标志
pub const SUCCESS_STATUS: &str = "SUCCESS";

const SHIPMENTS_ENDPOINT: &str = "shipments/";
/// 购买端点；此处的失败一律视为结果未知
pub const TRANSACTIONS_ENDPOINT: &str = "transactions/";

/// Shippo API 客户端
pub struct ShippoClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
}

impl ShippoClient {
    /// 创建新的 Shippo 客户端
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_secs: timeout.as_secs(),
        })
    }

    /// 按配置创建
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.shippo_api_key.clone(),
            config.shippo_api_base_url.clone(),
            config.request_timeout(),
        )
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// POST JSON 并解析响应
    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ShipmentError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_string(body).map_err(|e| {
            ShipmentError::service(endpoint, ServiceFailure::MalformedResponse(e.to_string()))
        })?;
        debug!("POST {} Payload: {}", endpoint, payload);

        let response = self
            .http
            .post(self.url(endpoint))
            .header("Authorization", format!("ShippoToken {}", self.api_key))
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ShipmentError::service(endpoint, self.classify(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ShipmentError::service(endpoint, self.classify(&e)))?;

        debug!("POST {} 返回 HTTP {}: {}", endpoint, status.as_u16(), truncate_body(&text, 500));

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ShipmentError::service(
                endpoint,
                ServiceFailure::Unauthorized {
                    status: status.as_u16(),
                },
            ));
        }
        if !status.is_success() {
            return Err(ShipmentError::service(
                endpoint,
                ServiceFailure::BadStatus {
                    status: status.as_u16(),
                    body: truncate_body(&text, 300),
                },
            ));
        }

        serde_json::from_str(&text).map_err(|e| {
            ShipmentError::service(endpoint, ServiceFailure::MalformedResponse(e.to_string()))
        })
    }

    fn classify(&self, err: &reqwest::Error) -> ServiceFailure {
        if err.is_timeout() {
            ServiceFailure::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ServiceFailure::Network(err.to_string())
        }
    }
}

#[async_trait]
impl ShippingGateway for ShippoClient {
    async fn request_rates(
        &self,
        request: &ShipmentRequest,
    ) -> Result<Vec<RateQuote>, ShipmentError> {
        let body = ShipmentCreateRequest {
            address_from: WireAddress::from(request.origin()),
            address_to: WireAddress::from(request.destination()),
            parcels: vec![WireParcel::from(request.parcel())],
            async_: false,
        };

        let response: ShipmentResponse = self.post_json(SHIPMENTS_ENDPOINT, &body).await?;

        if response.rates.is_empty() && !response.messages.is_empty() {
            debug!(
                "询价无报价，服务端消息: {:?}",
                message_texts(&response.messages)
            );
        }

        response
            .rates
            .into_iter()
            .map(WireRate::into_quote)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|reason| {
                ShipmentError::service(SHIPMENTS_ENDPOINT, ServiceFailure::MalformedResponse(reason))
            })
    }

    async fn purchase_label(
        &self,
        rate: &RateQuote,
        file_type: LabelFileType,
    ) -> Result<LabelTransaction, ShipmentError> {
        let body = TransactionCreateRequest {
            rate: &rate.rate_id,
            label_file_type: file_type,
            async_: false,
        };

        let response: TransactionResponse = self.post_json(TRANSACTIONS_ENDPOINT, &body).await?;
        Ok(response.into_transaction())
    }
}

// ========== 线上数据结构 ==========

#[derive(Serialize)]
struct ShipmentCreateRequest<'a> {
    address_from: WireAddress<'a>,
    address_to: WireAddress<'a>,
    parcels: Vec<WireParcel>,
    #[serde(rename = "async")]
    async_: bool,
}

#[derive(Serialize)]
struct WireAddress<'a> {
    name: &'a str,
    company: &'a str,
    street1: &'a str,
    street2: &'a str,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
    country: &'a str,
    phone: &'a str,
    email: &'a str,
}

impl<'a> From<&'a Address> for WireAddress<'a> {
    fn from(a: &'a Address) -> Self {
        Self {
            name: &a.name,
            company: &a.company,
            street1: &a.street1,
            street2: &a.street2,
            city: &a.city,
            state: &a.state,
            zip: &a.zip,
            country: &a.country,
            phone: &a.phone,
            email: &a.email,
        }
    }
}

#[derive(Serialize)]
struct WireParcel {
    length: String,
    width: String,
    height: String,
    distance_unit: &'static str,
    weight: String,
    mass_unit: &'static str,
}

impl From<&Parcel> for WireParcel {
    fn from(p: &Parcel) -> Self {
        Self {
            length: p.length.normalize().to_string(),
            width: p.width.normalize().to_string(),
            height: p.height.normalize().to_string(),
            distance_unit: p.distance_unit.as_str(),
            weight: p.weight.normalize().to_string(),
            mass_unit: p.mass_unit.as_str(),
        }
    }
}

#[derive(Deserialize)]
struct ShipmentResponse {
    #[serde(default)]
    rates: Vec<WireRate>,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

#[derive(Deserialize)]
struct WireRate {
    object_id: String,
    provider: String,
    servicelevel: WireServiceLevel,
    amount: String,
    currency: String,
    #[serde(default)]
    estimated_days: Option<u32>,
}

#[derive(Deserialize)]
struct WireServiceLevel {
    #[serde(default)]
    name: String,
    #[serde(default)]
    token: String,
}

impl WireRate {
    fn into_quote(self) -> Result<RateQuote, String> {
        let amount = Decimal::from_str(self.amount.trim())
            .map_err(|e| format!("rate {} has invalid amount {:?}: {}", self.object_id, self.amount, e))?;

        Ok(RateQuote {
            rate_id: self.object_id,
            provider: self.provider,
            service_level: self.servicelevel.name,
            service_token: self.servicelevel.token,
            amount,
            currency: self.currency,
            estimated_days: self.estimated_days,
        })
    }
}

#[derive(Serialize)]
struct TransactionCreateRequest<'a> {
    rate: &'a str,
    label_file_type: LabelFileType,
    #[serde(rename = "async")]
    async_: bool,
}

#[derive(Deserialize)]
struct TransactionResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

impl TransactionResponse {
    fn into_transaction(self) -> LabelTransaction {
        let messages = message_texts(&self.messages);

        if self.status != SUCCESS_STATUS {
            return LabelTransaction::Failed {
                status: self.status,
                messages,
            };
        }

        match (
            self.label_url.filter(|s| !s.is_empty()),
            self.tracking_number.filter(|s| !s.is_empty()),
        ) {
            (Some(label_url), Some(tracking_number)) => LabelTransaction::Purchased {
                tracking_number,
                label_url,
            },
            _ => {
                let mut messages = messages;
                messages.push(
                    "transaction reported SUCCESS without label_url or tracking_number".to_string(),
                );
                LabelTransaction::Failed {
                    status: self.status,
                    messages,
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    code: String,
    #[serde(default)]
    text: String,
}

fn message_texts(messages: &[WireMessage]) -> Vec<String> {
    messages
        .iter()
        .map(|m| if m.text.is_empty() { m.code.clone() } else { m.text.clone() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_success_status_is_purchased() {
        for status in ["QUEUED", "WAITING", "ERROR", "REFUNDED", "success"] {
            let response: TransactionResponse = serde_json::from_value(json!({
                "status": status,
                "label_url": "https://labels.example/1.pdf",
                "tracking_number": "9400100000000000000000",
                "messages": [{"source": "USPS", "code": "", "text": "Address not found"}]
            }))
            .unwrap();

            match response.into_transaction() {
                LabelTransaction::Failed { status: s, messages } => {
                    assert_eq!(s, status);
                    assert_eq!(messages, vec!["Address not found".to_string()]);
                }
                other => panic!("{} 不应视为购买成功: {:?}", status, other),
            }
        }
    }

    #[test]
    fn test_success_without_label_url_is_failed() {
        let response: TransactionResponse = serde_json::from_value(json!({
            "status": "SUCCESS",
            "label_url": "",
            "tracking_number": "9400100000000000000000",
            "messages": []
        }))
        .unwrap();

        assert!(!response.into_transaction().is_purchased());
    }

    #[test]
    fn test_rate_amount_must_be_decimal() {
        let rate: WireRate = serde_json::from_value(json!({
            "object_id": "rate_1",
            "provider": "USPS",
            "servicelevel": {"name": "Ground Advantage", "token": "usps_ground_advantage"},
            "amount": "abc",
            "currency": "USD"
        }))
        .unwrap();

        assert!(rate.into_quote().is_err());
    }

    #[test]
    fn test_parcel_wire_format() {
        let parcel = Parcel {
            length: Decimal::from_str("6.00").unwrap(),
            width: Decimal::from(6),
            height: Decimal::from(2),
            distance_unit: crate::models::DistanceUnit::In,
            weight: Decimal::from_str("2.5").unwrap(),
            mass_unit: crate::models::MassUnit::Lb,
        };
        let wire = serde_json::to_value(WireParcel::from(&parcel)).unwrap();
        assert_eq!(
            wire,
            json!({
                "length": "6", "width": "6", "height": "2", "distance_unit": "in",
                "weight": "2.5", "mass_unit": "lb"
            })
        );
    }
}
