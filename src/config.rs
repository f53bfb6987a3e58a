use crate::error::{AppError, AppResult, ConfigError};
use crate::models::{Address, LabelFileType, ParcelDefaults};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "bulk_labels.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- Shippo API 配置 ---
    pub shippo_api_key: String,
    pub shippo_api_base_url: String,
    /// 询价与购买请求超时（秒）
    pub request_timeout_secs: u64,
    /// 面单下载超时（秒）
    pub label_timeout_secs: u64,
    // --- 批处理配置 ---
    /// 批量运单文件（TOML）
    pub input_file: String,
    /// 报告输出目录
    pub output_dir: String,
    /// 面单保存目录
    pub labels_dir: String,
    /// 同时处理的行数，1 为顺序处理
    pub max_concurrent_rows: usize,
    pub completion_mode: CompletionMode,
    pub label_file_type: LabelFileType,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shippo_api_key: String::new(),
            shippo_api_base_url: "https://api.goshippo.com".to_string(),
            request_timeout_secs: 30,
            label_timeout_secs: 60,
            input_file: "shipments.toml".to_string(),
            output_dir: "data".to_string(),
            labels_dir: "labels".to_string(),
            max_concurrent_rows: 1,
            completion_mode: CompletionMode::BestEffort,
            label_file_type: LabelFileType::Pdf,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// 批次完成模式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// 单行失败只记录，继续处理后续行
    #[default]
    BestEffort,
    /// 任一行失败即中止整批
    FailFast,
}

impl FromStr for CompletionMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(CompletionMode::BestEffort),
            "fail_fast" => Ok(CompletionMode::FailFast),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionMode::BestEffort => write!(f, "best_effort"),
            CompletionMode::FailFast => write!(f, "fail_fast"),
        }
    }
}

/// 输入表格的列布局
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// `name_from` / `name_to` 成对列，含包裹尺寸列
    #[default]
    Paired,
    /// "Recipient Name" / "Street Line 1" 等收件人表格列，无发件人与尺寸列
    RecipientSheet,
}

/// 发件地址来源
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SenderSource {
    /// 每行自带发件人列
    #[default]
    PerRow,
    /// 所有行共用一个配置好的发件地址
    Configured { address: Address },
}

/// 报价选择策略
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RatePolicy {
    /// 取第一个报价
    #[default]
    FirstAvailable,
    /// 只接受 (provider, service_level) 完全一致的报价
    ExactMatch {
        provider: String,
        service_level: String,
    },
}

/// 流水线参数
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub field_layout: FieldLayout,
    /// 必填列；为空时使用列布局的默认必填列
    pub mandatory_fields: Option<Vec<String>>,
    pub sender: SenderSource,
    pub rate_policy: RatePolicy,
    /// 行内无尺寸时使用的默认尺寸；`None` 表示尺寸必填
    pub default_parcel: Option<ParcelDefaults>,
}

impl Config {
    /// 从环境变量加载（未设置的项使用默认值）
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file(path.display().to_string(), e))?;
        Self::from_toml_str(&content).map_err(|source| AppError::TomlParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 配置文件（`BULK_LABELS_CONFIG` 或 `bulk_labels.toml`）+ 环境变量，并校验
    pub fn load() -> AppResult<Self> {
        let path = std::env::var("BULK_LABELS_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(Path::new(&path))?
        } else {
            Self::default()
        };

        let config = base.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 环境变量覆盖
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = std::env::var("SHIPPO_API_KEY") {
            self.shippo_api_key = v;
        }
        if let Ok(v) = std::env::var("SHIPPO_API_BASE_URL") {
            self.shippo_api_base_url = v;
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT_SECS", "u64", |s| s.parse().ok())? {
            self.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("LABEL_TIMEOUT_SECS", "u64", |s| s.parse().ok())? {
            self.label_timeout_secs = v;
        }
        if let Ok(v) = std::env::var("INPUT_FILE") {
            self.input_file = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_DIR") {
            self.output_dir = v;
        }
        if let Ok(v) = std::env::var("LABELS_DIR") {
            self.labels_dir = v;
        }
        if let Some(v) = env_parse("MAX_CONCURRENT_ROWS", "usize", |s| s.parse().ok())? {
            self.max_concurrent_rows = v;
        }
        if let Some(v) = env_parse("COMPLETION_MODE", "best_effort|fail_fast", |s| s.parse().ok())? {
            self.completion_mode = v;
        }
        if let Some(v) = env_parse("LABEL_FILE_TYPE", "label file type", LabelFileType::parse)? {
            self.label_file_type = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING", "bool", |s| s.parse().ok())? {
            self.verbose_logging = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        Ok(self)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shippo_api_key.trim().is_empty() {
            return Err(invalid("shippo_api_key", "must be set (SHIPPO_API_KEY)"));
        }
        if self.max_concurrent_rows == 0 {
            return Err(invalid("max_concurrent_rows", "must be at least 1"));
        }
        if self.request_timeout_secs == 0 || self.label_timeout_secs == 0 {
            return Err(invalid("timeouts", "must be greater than zero"));
        }

        let pipeline = &self.pipeline;
        match &pipeline.sender {
            SenderSource::Configured { address } => {
                let missing = address.missing_required();
                if !missing.is_empty() {
                    return Err(invalid(
                        "pipeline.sender.address",
                        format!("missing {}", missing.join(", ")),
                    ));
                }
            }
            SenderSource::PerRow if pipeline.field_layout == FieldLayout::RecipientSheet => {
                return Err(invalid(
                    "pipeline.sender",
                    "recipient_sheet layout has no sender columns; configure a sender address",
                ));
            }
            SenderSource::PerRow => {}
        }

        if let RatePolicy::ExactMatch {
            provider,
            service_level,
        } = &pipeline.rate_policy
        {
            if provider.trim().is_empty() || service_level.trim().is_empty() {
                return Err(invalid(
                    "pipeline.rate_policy",
                    "exact_match needs both provider and service_level",
                ));
            }
        }

        if pipeline.field_layout == FieldLayout::RecipientSheet && pipeline.default_parcel.is_none() {
            return Err(invalid(
                "pipeline.default_parcel",
                "recipient_sheet layout has no dimension columns; set default parcel dimensions",
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn label_timeout(&self) -> Duration {
        Duration::from_secs(self.label_timeout_secs)
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn env_parse<T>(
    var_name: &str,
    expected_type: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => parse(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> Config {
        Config {
            shippo_api_key: "shippo_test_key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_are_sequential_best_effort() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_rows, 1);
        assert_eq!(config.completion_mode, CompletionMode::BestEffort);
        assert_eq!(config.pipeline.rate_policy, RatePolicy::FirstAvailable);
        assert!(config.pipeline.default_parcel.is_none());
        assert!(with_key().validate().is_ok());
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        assert!(Config::default().validate().is_err());
    }

    #[test]
    fn test_toml_pipeline_settings() {
        let config = Config::from_toml_str(
            r#"
            shippo_api_key = "shippo_test_key"
            completion_mode = "fail_fast"
            label_file_type = "PDF_4x6"

            [pipeline]
            field_layout = "recipient_sheet"
            mandatory_fields = ["Recipient Name", "Zip/Postal Code"]

            [pipeline.sender]
            source = "configured"
            address = { name = "Shawn Ippotle", street1 = "215 Clayton St.", city = "San Francisco", state = "CA", zip = "94117", country = "US" }

            [pipeline.rate_policy]
            policy = "exact_match"
            provider = "USPS"
            service_level = "Ground Advantage"

            [pipeline.default_parcel]
            length = "6"
            width = "6"
            height = "2"
            distance_unit = "in"
            "#,
        )
        .unwrap();

        assert_eq!(config.completion_mode, CompletionMode::FailFast);
        assert_eq!(config.label_file_type, LabelFileType::Pdf4x6);
        assert_eq!(config.pipeline.field_layout, FieldLayout::RecipientSheet);
        assert_eq!(
            config.pipeline.rate_policy,
            RatePolicy::ExactMatch {
                provider: "USPS".to_string(),
                service_level: "Ground Advantage".to_string(),
            }
        );
        assert_eq!(config.pipeline.default_parcel, Some(ParcelDefaults::default()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_recipient_sheet_requires_configured_sender() {
        let mut config = with_key();
        config.pipeline.field_layout = FieldLayout::RecipientSheet;
        config.pipeline.default_parcel = Some(ParcelDefaults::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configured_sender_must_be_complete() {
        let mut config = with_key();
        config.pipeline.sender = SenderSource::Configured {
            address: Address {
                name: "Shawn Ippotle".to_string(),
                city: "San Francisco".to_string(),
                ..Default::default()
            },
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_completion_mode_from_str() {
        assert_eq!("fail-fast".parse::<CompletionMode>(), Ok(CompletionMode::FailFast));
        assert_eq!("BEST_EFFORT".parse::<CompletionMode>(), Ok(CompletionMode::BestEffort));
        assert!("sometimes".parse::<CompletionMode>().is_err());
    }
}
