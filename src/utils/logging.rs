use anyhow::Result;
/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use std::fs::{self, OpenOptions};
use std::io::Write;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchStats;
use crate::services::WrittenOutputs;

/// 初始化 tracing
///
/// `RUST_LOG` 优先；否则 verbose 为 debug，默认 info
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 初始化日志文件
///
/// # 参数
/// - `log_file_path`: 日志文件路径
pub fn init_log_file(log_file_path: &str) -> Result<()> {
    let log_header = format!(
        "{}\n批量面单日志 - {}\n{}\n\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(60)
    );
    fs::write(log_file_path, log_header)?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    let mode = if config.max_concurrent_rows > 1 {
        "并发处理模式"
    } else {
        "顺序处理模式"
    };

    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量面单{}", mode);
    info!("🌐 运价服务: {}", config.shippo_api_base_url);
    info!("📊 最大并发数: {}", config.max_concurrent_rows);
    info!("🧭 完成模式: {}", config.completion_mode);
    info!("🏷️ 面单格式: {}", config.label_file_type.as_str());
    info!("{}", "=".repeat(60));
}

/// 记录运单行加载信息
///
/// # 参数
/// - `total`: 行数
/// - `required_fields`: 生效的必填字段
pub fn log_rows_loaded(total: usize, required_fields: &[String]) {
    info!("✓ 找到 {} 个待处理的运单行", total);
    info!("📋 必填字段: {}", required_fields.join(", "));
}

/// 打印最终统计信息
///
/// # 参数
/// - `stats`: 批处理统计
/// - `log_file_path`: 日志文件路径
pub fn print_final_stats(stats: &BatchStats, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.succeeded, stats.total);
    info!("❌ 失败: {}", stats.failed);
    for (kind, count) in &stats.failures_by_kind {
        info!("   - {}: {}", kind, count);
    }
    if stats.cancelled > 0 {
        warn!("   - 已取消: {}", stats.cancelled);
    }
    for (currency, amount) in &stats.spend {
        info!("💰 花费: {} {}", amount, currency);
    }
    info!("{}", "=".repeat(60));
    info!("\n日志已保存至: {}", log_file_path);
}

/// 把本次运行摘要追加到日志文件
pub fn append_run_summary(
    log_file_path: &str,
    stats: &BatchStats,
    outputs: &WrittenOutputs,
) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    writeln!(file, "成功: {}/{}", stats.succeeded, stats.total)?;
    writeln!(file, "失败: {}", stats.failed)?;
    for (kind, count) in &stats.failures_by_kind {
        writeln!(file, "  {}: {}", kind, count)?;
    }
    if stats.cancelled > 0 {
        writeln!(file, "  cancelled: {}", stats.cancelled)?;
    }
    for (currency, amount) in &stats.spend {
        writeln!(file, "花费: {} {}", amount, currency)?;
    }
    writeln!(file, "结果表: {}", outputs.report.display())?;
    if let Some(path) = &outputs.error_log {
        writeln!(file, "错误日志: {}", path.display())?;
    }
    if let Some(path) = &outputs.label_manifest {
        writeln!(file, "面单列表: {}", path.display())?;
    }
    Ok(())
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
