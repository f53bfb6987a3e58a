//! 错误类型
//!
//! - `ShipmentError`：单行处理失败，在行边界被捕获
//! - `BatchAborted`：fail-fast 模式下中止整批
//! - `AppError`：进程级错误（配置 / 文件 / HTTP 客户端）

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::clients::shippo_client::TRANSACTIONS_ENDPOINT;
use crate::models::report::BatchReport;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    /// 必填字段缺失或取值非法，提交方可修正
    Validation,
    /// 与运价服务通信失败，可能是暂时性的
    Service,
    /// 没有符合策略的报价
    NoQualifyingRate,
    /// 远端明确拒绝购买
    PurchaseFailure,
    /// 已购买但面单下载失败
    Retrieval,
    /// 处理过程中出现内部故障（panic 等）
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Service => "service",
            ErrorKind::NoQualifyingRate => "no_qualifying_rate",
            ErrorKind::PurchaseFailure => "purchase_failure",
            ErrorKind::Retrieval => "retrieval",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// 运价服务调用失败的原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("no response within {secs}s")]
    Timeout { secs: u64 },
    #[error("authentication rejected (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("unexpected HTTP {status}: {body}")]
    BadStatus { status: u16, body: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// 单行处理错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShipmentError {
    #[error("missing mandatory fields: {}", .missing_fields.join(", "))]
    Validation { missing_fields: Vec<String> },

    #[error("invalid value {value:?} for field {field}: {reason}")]
    InvalidField {
        field: String,
        value: String,
        reason: String,
    },

    #[error("rate service error ({endpoint}): {cause}")]
    Service {
        endpoint: String,
        cause: ServiceFailure,
    },

    #[error("no qualifying rate under policy {policy} ({candidates} candidates)")]
    NoQualifyingRate { policy: String, candidates: usize },

    #[error("label purchase declined for rate {rate_id} (status {status}): {}", .messages.join("; "))]
    PurchaseFailed {
        rate_id: String,
        status: String,
        messages: Vec<String>,
    },

    #[error("rate {rate_id} was already submitted for purchase; refusing to buy it twice")]
    DuplicatePurchase { rate_id: String },

    #[error(
        "label purchased (tracking {tracking_number}) but download from {url} failed ({}): {detail}",
        .status.map_or_else(|| "no HTTP status".to_string(), |s| format!("HTTP {s}"))
    )]
    Retrieval {
        url: String,
        status: Option<u16>,
        tracking_number: String,
        detail: String,
    },

    #[error("internal failure after stage {stage}: {detail}")]
    Internal { stage: String, detail: String },
}

impl ShipmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShipmentError::Validation { .. } | ShipmentError::InvalidField { .. } => {
                ErrorKind::Validation
            }
            ShipmentError::Service { .. } => ErrorKind::Service,
            ShipmentError::NoQualifyingRate { .. } => ErrorKind::NoQualifyingRate,
            ShipmentError::PurchaseFailed { .. } | ShipmentError::DuplicatePurchase { .. } => {
                ErrorKind::PurchaseFailure
            }
            ShipmentError::Retrieval { .. } => ErrorKind::Retrieval,
            ShipmentError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// 仅暂时性的询价错误可重试；购买端点的失败可能已扣费，从不可重试
    pub fn is_retryable(&self) -> bool {
        match self {
            ShipmentError::Service { endpoint, cause } => {
                endpoint != TRANSACTIONS_ENDPOINT
                    && matches!(
                        cause,
                        ServiceFailure::Network(_)
                            | ServiceFailure::Timeout { .. }
                            | ServiceFailure::BadStatus { status: 429 | 500..=599, .. }
                    )
            }
            _ => false,
        }
    }

    /// 创建服务错误
    pub fn service(endpoint: impl Into<String>, cause: ServiceFailure) -> Self {
        ShipmentError::Service {
            endpoint: endpoint.into(),
            cause,
        }
    }

    /// 创建字段取值错误
    pub fn invalid_field(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ShipmentError::InvalidField {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// fail-fast 模式下中止整批
///
/// 携带已累积的部分报告：已经购买的面单不能丢。
#[derive(Debug, Error)]
#[error("batch aborted at row {row}: {cause}")]
pub struct BatchAborted {
    /// 1-based
    pub row: usize,
    pub cause: ShipmentError,
    pub partial: BatchReport,
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var_name}={value:?} is not a valid {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// 应用程序错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("file error ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML ({path}): {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_names_every_field() {
        let err = ShipmentError::Validation {
            missing_fields: vec!["zip_to".to_string(), "city_to".to_string()],
        };
        assert_eq!(err.to_string(), "missing mandatory fields: zip_to, city_to");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_transient_service_errors_are_retryable() {
        assert!(ShipmentError::service("shipments", ServiceFailure::Timeout { secs: 30 })
            .is_retryable());
        assert!(ShipmentError::service(
            "shipments",
            ServiceFailure::BadStatus {
                status: 503,
                body: String::new()
            }
        )
        .is_retryable());
        assert!(
            !ShipmentError::service("shipments", ServiceFailure::Unauthorized { status: 401 })
                .is_retryable()
        );
        assert!(
            !ShipmentError::service(TRANSACTIONS_ENDPOINT, ServiceFailure::Timeout { secs: 30 })
                .is_retryable()
        );

        let declined = ShipmentError::PurchaseFailed {
            rate_id: "r1".to_string(),
            status: "ERROR".to_string(),
            messages: vec!["Insufficient funds".to_string()],
        };
        assert_eq!(declined.kind(), ErrorKind::PurchaseFailure);
        assert!(!declined.is_retryable());
    }

    #[test]
    fn test_retrieval_error_mentions_purchase() {
        let err = ShipmentError::Retrieval {
            url: "https://labels.example/1.pdf".to_string(),
            status: Some(404),
            tracking_number: "9400100000000000000000".to_string(),
            detail: "not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("HTTP 404"));
        assert!(message.contains("9400100000000000000000"));
        assert_eq!(err.kind(), ErrorKind::Retrieval);
    }
}
