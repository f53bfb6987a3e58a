/// 面单文件下载客户端
use crate::clients::LabelHost;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{build_http_client, truncate_body};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// 面单下载失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFetchError {
    /// 远端返回的 HTTP 状态；网络错误或超时时为 `None`
    pub status: Option<u16>,
    pub detail: String,
}

impl fmt::Display for LabelFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for LabelFetchError {}

/// 通过普通 HTTP GET 下载面单
pub struct HttpLabelHost {
    http: reqwest::Client,
    timeout_secs: u64,
}

impl HttpLabelHost {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            timeout_secs: timeout.as_secs(),
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(config.label_timeout())
    }
}

#[async_trait]
impl LabelHost for HttpLabelHost {
    async fn fetch_label(&self, url: &str) -> Result<Vec<u8>, LabelFetchError> {
        debug!("下载面单: {}", url);

        let response = self.http.get(url).send().await.map_err(|e| LabelFetchError {
            status: e.status().map(|s| s.as_u16()),
            detail: if e.is_timeout() {
                format!("no response within {}s", self.timeout_secs)
            } else {
                e.to_string()
            },
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabelFetchError {
                status: Some(status.as_u16()),
                detail: truncate_body(&body, 200),
            });
        }

        let bytes = response.bytes().await.map_err(|e| LabelFetchError {
            status: Some(status.as_u16()),
            detail: format!("failed to read body: {}", e),
        })?;

        Ok(bytes.to_vec())
    }
}
