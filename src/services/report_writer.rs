//! 报告写入服务 - 业务能力层
//!
//! 只负责把 `BatchReport` 落盘，交给下游：
//! - `{base}_with_tracking.json`：原始列 + 运单号 / 承运商 / 服务等级 / 价格
//! - `{base}_errors.log`：逐行错误（有失败时才写）
//! - `{base}_labels.txt`：按行序的面单文件列表（交给 PDF 合并方）

use serde_json::{Map, Value as JsonValue};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::report::display_path;
use crate::models::{BatchReport, ShipmentResult};

/// 追加到原始列之后的结果列
pub const RESULT_COLUMNS: [&str; 4] = ["tracking_number", "carrier", "shipment_level", "price"];

/// 实际写出的文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenOutputs {
    pub report: PathBuf,
    pub error_log: Option<PathBuf>,
    pub label_manifest: Option<PathBuf>,
}

/// 报告写入服务
pub struct ReportWriter {
    output_dir: PathBuf,
    base_name: String,
}

impl ReportWriter {
    /// # 参数
    /// - `output_dir`: 输出目录
    /// - `base_name`: 输出文件名前缀（通常取输入文件名）
    pub fn new(output_dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_name: base_name.into(),
        }
    }

    /// 以输入文件名（去掉扩展名）为前缀
    pub fn for_input(output_dir: impl Into<PathBuf>, input_file: &Path) -> Self {
        let base_name = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "shipments".to_string());
        Self::new(output_dir, base_name)
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}{}", self.base_name, suffix))
    }

    /// 写出全部文件
    pub async fn write_all(&self, report: &BatchReport) -> AppResult<WrittenOutputs> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::file(display_path(&self.output_dir), e))?;

        Ok(WrittenOutputs {
            report: self.write_report(report).await?,
            error_log: self.write_error_log(report).await?,
            label_manifest: self.write_label_manifest(report).await?,
        })
    }

    /// 写结果表
    pub async fn write_report(&self, report: &BatchReport) -> AppResult<PathBuf> {
        let path = self.path("_with_tracking.json");
        let rows = report_rows(report);
        let content = serde_json::to_string_pretty(&rows).map_err(|source| AppError::Serialize {
            what: "report".to_string(),
            source,
        })?;

        write_file(&path, content).await?;
        info!("📄 结果表已写入: {}", path.display());
        Ok(path)
    }

    /// 写错误日志；没有失败行时不写
    pub async fn write_error_log(&self, report: &BatchReport) -> AppResult<Option<PathBuf>> {
        let messages = report.error_messages();
        if messages.is_empty() {
            return Ok(None);
        }

        let path = self.path("_errors.log");
        debug!("写入错误日志: {} 行", messages.len());
        write_file(&path, messages.join("\n") + "\n").await?;
        info!("📝 错误日志已写入: {}", path.display());
        Ok(Some(path))
    }

    /// 写面单文件列表；没有成功行时不写
    pub async fn write_label_manifest(&self, report: &BatchReport) -> AppResult<Option<PathBuf>> {
        if report.label_files().is_empty() {
            return Ok(None);
        }

        let path = self.path("_labels.txt");
        let lines: Vec<String> = report.label_files().iter().map(|p| display_path(p)).collect();
        write_file(&path, lines.join("\n") + "\n").await?;
        info!("🏷️ 面单列表已写入: {} ({} 个)", path.display(), lines.len());
        Ok(Some(path))
    }
}

/// 每个输入行一个对象：原始列 + 结果列（失败行为空字符串）
pub fn report_rows(report: &BatchReport) -> Vec<Map<String, JsonValue>> {
    report
        .results()
        .iter()
        .map(|result| {
            let mut row = match serde_json::to_value(result.row()) {
                Ok(JsonValue::Object(map)) => map,
                _ => Map::new(),
            };

            let values: [String; 4] = match result {
                ShipmentResult::Success(s) => [
                    s.tracking_number.clone(),
                    s.carrier.clone(),
                    s.service_level.clone(),
                    s.price.to_string(),
                ],
                ShipmentResult::Error(_) => Default::default(),
            };

            for (column, value) in RESULT_COLUMNS.iter().zip(values) {
                row.insert(column.to_string(), JsonValue::String(value));
            }
            row
        })
        .collect()
}

async fn write_file(path: &Path, content: String) -> AppResult<()> {
    fs::write(path, content)
        .await
        .map_err(|e| AppError::file(display_path(path), e))
}
