//! 集成测试共用的替身与数据

#![allow(dead_code)]

use async_trait::async_trait;
use bulk_labels::clients::LabelFetchError;
use bulk_labels::models::{LabelFileType, LabelTransaction, RateQuote, ShipmentRequest};
use bulk_labels::{Config, LabelHost, RawRow, ShipmentError, ShippingGateway};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// 可编排的运价服务替身
///
/// 报价 ID 形如 `{收件人}#{序号}`，每行各不相同
pub struct FakeGateway {
    quotes: Vec<(&'static str, &'static str, i64)>,
    rate_failures: HashMap<String, ShipmentError>,
    declined: HashMap<String, LabelTransaction>,
    delays: HashMap<String, Duration>,
    panics: HashSet<String>,
    rate_calls: AtomicUsize,
    purchases: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            quotes: vec![
                ("UPS", "Ground", 1250),
                ("USPS", "Priority Mail", 915),
                ("USPS", "Ground Advantage", 745),
            ],
            rate_failures: HashMap::new(),
            declined: HashMap::new(),
            delays: HashMap::new(),
            panics: HashSet::new(),
            rate_calls: AtomicUsize::new(0),
            purchases: Mutex::new(Vec::new()),
        }
    }

    /// 报价列表：(provider, service_level, 金额分)
    pub fn with_quotes(mut self, quotes: Vec<(&'static str, &'static str, i64)>) -> Self {
        self.quotes = quotes;
        self
    }

    pub fn failing_rates(mut self, recipient: &str, error: ShipmentError) -> Self {
        self.rate_failures.insert(recipient.to_string(), error);
        self
    }

    pub fn declining(mut self, recipient: &str, status: &str, message: &str) -> Self {
        self.declined.insert(
            recipient.to_string(),
            LabelTransaction::Failed {
                status: status.to_string(),
                messages: vec![message.to_string()],
            },
        );
        self
    }

    pub fn slow(mut self, recipient: &str, millis: u64) -> Self {
        self.delays
            .insert(recipient.to_string(), Duration::from_millis(millis));
        self
    }

    /// 询价时直接 panic
    pub fn panicking(mut self, recipient: &str) -> Self {
        self.panics.insert(recipient.to_string());
        self
    }

    pub fn rate_calls(&self) -> usize {
        self.rate_calls.load(Ordering::SeqCst)
    }

    /// 按调用顺序记录的已购买报价 ID
    pub fn purchases(&self) -> Vec<String> {
        self.purchases.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShippingGateway for FakeGateway {
    async fn request_rates(&self, request: &ShipmentRequest) -> Result<Vec<RateQuote>, ShipmentError> {
        self.rate_calls.fetch_add(1, Ordering::SeqCst);
        let recipient = request.destination().name.clone();

        if let Some(delay) = self.delays.get(&recipient) {
            tokio::time::sleep(*delay).await;
        }
        if self.panics.contains(&recipient) {
            panic!("rate table corrupted for {}", recipient);
        }
        if let Some(error) = self.rate_failures.get(&recipient) {
            return Err(error.clone());
        }

        Ok(self
            .quotes
            .iter()
            .enumerate()
            .map(|(i, (provider, service_level, cents))| RateQuote {
                rate_id: format!("{}#{}", recipient, i),
                provider: provider.to_string(),
                service_level: service_level.to_string(),
                service_token: String::new(),
                amount: Decimal::new(*cents, 2),
                currency: "USD".to_string(),
                estimated_days: Some(3),
            })
            .collect())
    }

    async fn purchase_label(
        &self,
        rate: &RateQuote,
        _file_type: LabelFileType,
    ) -> Result<LabelTransaction, ShipmentError> {
        self.purchases.lock().unwrap().push(rate.rate_id.clone());
        let recipient = rate.rate_id.split('#').next().unwrap_or_default();

        if let Some(declined) = self.declined.get(recipient) {
            return Ok(declined.clone());
        }

        let slug = rate.rate_id.replace([' ', '#'], "-");
        Ok(LabelTransaction::Purchased {
            tracking_number: format!("TRK-{}", slug),
            label_url: format!("https://labels.test/{}.pdf", slug),
        })
    }
}

/// 面单托管替身；`missing` 中的地址返回 404
#[derive(Default)]
pub struct FakeHost {
    missing: HashSet<String>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn missing(mut self, url: &str) -> Self {
        self.missing.insert(url.to_string());
        self
    }
}

#[async_trait]
impl LabelHost for FakeHost {
    async fn fetch_label(&self, url: &str) -> Result<Vec<u8>, LabelFetchError> {
        if self.missing.contains(url) {
            return Err(LabelFetchError {
                status: Some(404),
                detail: "Not Found".to_string(),
            });
        }
        Ok(format!("%PDF-1.4 {}", url).into_bytes())
    }
}

/// `name_from` / `name_to` 布局的一行
pub fn paired_row(recipient: &str, zip_to: &str) -> RawRow {
    RawRow::new()
        .with("name_from", "Shawn Ippotle")
        .with("street1_from", "215 Clayton St.")
        .with("city_from", "San Francisco")
        .with("state_from", "CA")
        .with("zip_from", "94117")
        .with("country_from", "US")
        .with("name_to", recipient)
        .with("street1_to", "123 Broadway 1")
        .with("city_to", "New York")
        .with("state_to", "NY")
        .with("zip_to", zip_to)
        .with("country_to", "US")
        .with("length", "5")
        .with("width", "5")
        .with("height", "5")
        .with("length_unit", "in")
        .with("weight", "2")
        .with("unit", "lb")
}

/// 每次测试独立的临时目录
pub fn scratch_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "bulk_labels_it_{}_{}",
        name,
        chrono::Local::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

/// 指向临时目录的测试配置
pub fn test_config(dir: &PathBuf) -> Config {
    Config {
        shippo_api_key: "shippo_test_key".to_string(),
        labels_dir: dir.join("labels").to_string_lossy().to_string(),
        output_dir: dir.join("out").to_string_lossy().to_string(),
        output_log_file: dir.join("output.txt").to_string_lossy().to_string(),
        input_file: dir.join("march.toml").to_string_lossy().to_string(),
        request_timeout_secs: 5,
        label_timeout_secs: 5,
        ..Default::default()
    }
}
