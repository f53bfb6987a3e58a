use crate::models::shipment::RawRow;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tokio::fs;

/// 批量运单文件
///
/// ```toml
/// [[rows]]
/// name_to = "Mr Hippo"
/// street1_to = "123 Broadway 1"
/// zip_to = "10007"
/// weight = 2
/// ```
#[derive(Debug, Deserialize)]
struct BatchFile {
    #[serde(default)]
    rows: Vec<RawRow>,
}

/// 从 TOML 文件加载所有待处理的行
pub async fn load_batch_file(batch_file_path: &Path) -> Result<Vec<RawRow>> {
    let content = fs::read_to_string(batch_file_path)
        .await
        .with_context(|| format!("无法读取批量文件: {}", batch_file_path.display()))?;

    let rows = parse_batch(&content)
        .with_context(|| format!("无法解析批量文件: {}", batch_file_path.display()))?;

    tracing::info!(
        "成功加载 {} 行: {}",
        rows.len(),
        batch_file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
    );

    Ok(rows)
}

/// 解析 TOML 文本
pub fn parse_batch(content: &str) -> Result<Vec<RawRow>> {
    let batch: BatchFile = toml::from_str(content)?;
    warn_on_ragged_rows(&batch.rows);
    Ok(batch.rows)
}

/// 各行列名应一致；不一致时缺列按空值处理，这里只提示
fn warn_on_ragged_rows(rows: &[RawRow]) {
    let Some(first) = rows.first() else {
        return;
    };
    let expected: BTreeSet<&str> = first.columns().collect();

    for (index, row) in rows.iter().enumerate().skip(1) {
        let columns: BTreeSet<&str> = row.columns().collect();
        if columns != expected {
            let missing: Vec<&str> = expected.difference(&columns).copied().collect();
            let extra: Vec<&str> = columns.difference(&expected).copied().collect();
            tracing::warn!(
                "⚠️ 第 {} 行列名与第 1 行不一致 (缺少: {:?}, 多出: {:?})",
                index + 1,
                missing,
                extra
            );
        }
    }
}
