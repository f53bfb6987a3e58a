//! 报价选择 - 业务能力层
//!
//! 选择策略可插拔：新增目标承运商 / 服务等级只需新的策略实现或配置，
//! 不改动编排层。

use crate::config::RatePolicy;
use crate::error::ShipmentError;
use crate::models::RateQuote;

/// 报价选择策略
pub trait RateSelector: Send + Sync {
    /// 策略名（用于日志和错误信息）
    fn name(&self) -> String;

    /// 从候选报价中选出恰好一个，或返回 `NoQualifyingRate`
    fn select<'a>(&self, quotes: &'a [RateQuote]) -> Result<&'a RateQuote, ShipmentError>;
}

/// 取第一个报价（未配置偏好时使用）
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl RateSelector for FirstAvailable {
    fn name(&self) -> String {
        "first_available".to_string()
    }

    fn select<'a>(&self, quotes: &'a [RateQuote]) -> Result<&'a RateQuote, ShipmentError> {
        quotes.first().ok_or_else(|| ShipmentError::NoQualifyingRate {
            policy: self.name(),
            candidates: 0,
        })
    }
}

/// 只接受 (provider, service_level) 完全一致的报价，不做替代
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactMatch {
    pub provider: String,
    pub service_level: String,
}

impl ExactMatch {
    pub fn new(provider: impl Into<String>, service_level: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            service_level: service_level.into(),
        }
    }
}

impl RateSelector for ExactMatch {
    fn name(&self) -> String {
        format!("exact_match({} / {})", self.provider, self.service_level)
    }

    fn select<'a>(&self, quotes: &'a [RateQuote]) -> Result<&'a RateQuote, ShipmentError> {
        quotes
            .iter()
            .find(|q| q.matches(&self.provider, &self.service_level))
            .ok_or_else(|| ShipmentError::NoQualifyingRate {
                policy: self.name(),
                candidates: quotes.len(),
            })
    }
}

/// 按配置创建选择策略
pub fn selector_for(policy: &RatePolicy) -> Box<dyn RateSelector> {
    match policy {
        RatePolicy::FirstAvailable => Box::new(FirstAvailable),
        RatePolicy::ExactMatch {
            provider,
            service_level,
        } => Box::new(ExactMatch::new(provider.clone(), service_level.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn quote(id: &str, provider: &str, service_level: &str, amount: i64) -> RateQuote {
        RateQuote {
            rate_id: id.to_string(),
            provider: provider.to_string(),
            service_level: service_level.to_string(),
            service_token: String::new(),
            amount: Decimal::from(amount),
            currency: "USD".to_string(),
            estimated_days: None,
        }
    }

    fn candidates() -> Vec<RateQuote> {
        vec![
            quote("r1", "UPS", "Ground", 12),
            quote("r2", "USPS", "Priority Mail", 9),
            quote("r3", "USPS", "Ground Advantage", 7),
            quote("r4", "DHL", "Express", 3),
        ]
    }

    #[test]
    fn test_first_available_takes_first_quote() {
        let quotes = candidates();
        assert_eq!(FirstAvailable.select(&quotes).unwrap().rate_id, "r1");
    }

    #[test]
    fn test_first_available_with_no_quotes() {
        assert!(matches!(
            FirstAvailable.select(&[]),
            Err(ShipmentError::NoQualifyingRate { candidates: 0, .. })
        ));
    }

    #[test]
    fn test_exact_match_ignores_cheaper_quotes() {
        let quotes = candidates();
        let selector = ExactMatch::new("USPS", "Ground Advantage");
        let chosen = selector.select(&quotes).unwrap();
        assert_eq!(chosen.rate_id, "r3");
        assert!(chosen.matches("USPS", "Ground Advantage"));
    }

    #[test]
    fn test_exact_match_never_substitutes() {
        let quotes = vec![
            quote("r1", "USPS", "Priority Mail", 9),
            quote("r2", "UPS", "Ground Advantage", 5),
        ];
        let selector = ExactMatch::new("USPS", "Ground Advantage");

        match selector.select(&quotes) {
            Err(ShipmentError::NoQualifyingRate { policy, candidates }) => {
                assert_eq!(candidates, 2);
                assert!(policy.contains("USPS"));
            }
            other => panic!("不应替代为其他报价: {:?}", other),
        }
    }

    #[test]
    fn test_selector_for_policy() {
        let quotes = candidates();
        let selector = selector_for(&RatePolicy::ExactMatch {
            provider: "DHL".to_string(),
            service_level: "Express".to_string(),
        });
        assert_eq!(selector.select(&quotes).unwrap().rate_id, "r4");
        assert_eq!(selector_for(&RatePolicy::FirstAvailable).name(), "first_available");
    }
}
