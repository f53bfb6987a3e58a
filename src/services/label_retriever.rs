//! 面单下载服务 - 业务能力层
//!
//! 只负责"把已购买的面单存到本地"

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::time::timeout;
use tracing::debug;

use crate::clients::LabelHost;
use crate::error::ShipmentError;

/// 面单下载服务
pub struct LabelRetriever {
    host: Arc<dyn LabelHost>,
    labels_dir: PathBuf,
    timeout: Duration,
}

impl LabelRetriever {
    pub fn new(host: Arc<dyn LabelHost>, labels_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            host,
            labels_dir: labels_dir.into(),
            timeout,
        }
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels_dir
    }

    /// 下载面单并保存
    ///
    /// # 参数
    /// - `label_url`: 面单远端地址
    /// - `file_name`: 本地文件名
    /// - `tracking_number`: 仅用于错误信息（此时已扣费）
    ///
    /// # 返回
    /// 返回本地路径；失败返回 `ShipmentError::Retrieval`
    pub async fn retrieve(
        &self,
        label_url: &str,
        file_name: &str,
        tracking_number: &str,
    ) -> Result<PathBuf, ShipmentError> {
        let failure = |status: Option<u16>, detail: String| ShipmentError::Retrieval {
            url: label_url.to_string(),
            status,
            tracking_number: tracking_number.to_string(),
            detail,
        };

        let bytes = match timeout(self.timeout, self.host.fetch_label(label_url)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(failure(e.status, e.detail)),
            Err(_) => {
                return Err(failure(
                    None,
                    format!("no response within {}s", self.timeout.as_secs()),
                ))
            }
        };

        if bytes.is_empty() {
            return Err(failure(None, "empty label file".to_string()));
        }

        fs::create_dir_all(&self.labels_dir)
            .await
            .map_err(|e| failure(None, format!("cannot create {}: {}", self.labels_dir.display(), e)))?;

        let path = self.labels_dir.join(file_name);
        fs::write(&path, &bytes)
            .await
            .map_err(|e| failure(None, format!("cannot write {}: {}", path.display(), e)))?;

        debug!("面单已保存: {} ({} 字节)", path.display(), bytes.len());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::LabelFetchError;
    use async_trait::async_trait;

    struct StaticHost(Result<Vec<u8>, LabelFetchError>);

    #[async_trait]
    impl LabelHost for StaticHost {
        async fn fetch_label(&self, _url: &str) -> Result<Vec<u8>, LabelFetchError> {
            self.0.clone()
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "bulk_labels_retriever_{}_{}",
            name,
            chrono::Local::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    #[tokio::test]
    async fn test_label_is_written_to_labels_dir() {
        let dir = scratch_dir("ok");
        let retriever = LabelRetriever::new(
            Arc::new(StaticHost(Ok(b"%PDF-1.4 label".to_vec()))),
            &dir,
            Duration::from_secs(5),
        );

        let path = retriever
            .retrieve("https://labels.example/1.pdf", "label_1.pdf", "TRK1")
            .await
            .unwrap();

        assert_eq!(path, dir.join("label_1.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 label");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_remote_failure_carries_url_and_status() {
        let retriever = LabelRetriever::new(
            Arc::new(StaticHost(Err(LabelFetchError {
                status: Some(404),
                detail: "Not Found".to_string(),
            }))),
            scratch_dir("missing"),
            Duration::from_secs(5),
        );

        match retriever
            .retrieve("https://labels.example/2.pdf", "label_2.pdf", "TRK2")
            .await
        {
            Err(ShipmentError::Retrieval {
                url,
                status,
                tracking_number,
                ..
            }) => {
                assert_eq!(url, "https://labels.example/2.pdf");
                assert_eq!(status, Some(404));
                assert_eq!(tracking_number, "TRK2");
            }
            other => panic!("应当返回 Retrieval 错误: {:?}", other),
        }
    }
}
