//! 批量面单处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责资源管理和批次的首尾工作。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、创建 Shippo 客户端与面单下载客户端
//! 2. **批量加载**：读取批量运单文件（`Vec<RawRow>`）
//! 3. **取消**：Ctrl-C 置位取消标志，已开始的行走完
//! 4. **委托处理**：交给 `BatchOrchestrator`
//! 5. **报告输出**：结果表、错误日志、面单列表（fail-fast 中止时输出部分报告）
//! 6. **全局统计**：成功 / 失败 / 花费

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::clients::{HttpLabelHost, LabelHost, ShippingGateway, ShippoClient};
use crate::config::Config;
use crate::models::{load_batch_file, BatchReport, RawRow};
use crate::orchestrator::shipment_batch::{BatchOrchestrator, CancelFlag};
use crate::services::ReportWriter;
use crate::utils::logging::{
    append_run_summary, init_log_file, log_rows_loaded, log_startup, print_final_stats,
};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: BatchOrchestrator,
    writer: ReportWriter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;

        log_startup(&config);

        let gateway: Arc<dyn ShippingGateway> =
            Arc::new(ShippoClient::from_config(&config).context("创建 Shippo 客户端失败")?);
        let host: Arc<dyn LabelHost> =
            Arc::new(HttpLabelHost::from_config(&config).context("创建面单下载客户端失败")?);

        Ok(Self::with_services(config, gateway, host))
    }

    /// 使用给定的外部服务创建（测试中传入替身）
    pub fn with_services(
        config: Config,
        gateway: Arc<dyn ShippingGateway>,
        host: Arc<dyn LabelHost>,
    ) -> Self {
        let orchestrator = BatchOrchestrator::new(&config, gateway, host);
        let writer = ReportWriter::for_input(&config.output_dir, Path::new(&config.input_file));
        Self {
            config,
            orchestrator,
            writer,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<BatchReport> {
        let rows = self.load_rows().await?;

        if rows.is_empty() {
            warn!("⚠️ 批量文件中没有运单行，程序结束");
            return Ok(BatchReport::default());
        }

        log_rows_loaded(rows.len(), self.orchestrator.flow().normalizer().required_fields());

        let cancel = CancelFlag::new();
        let watcher = watch_ctrl_c(cancel.clone());
        let outcome = self.run_rows(rows, &cancel).await;
        watcher.abort();

        outcome
    }

    /// 处理已加载的行并写出报告
    pub async fn run_rows(&self, rows: Vec<RawRow>, cancel: &CancelFlag) -> Result<BatchReport> {
        match self.orchestrator.run(rows, cancel).await {
            Ok(report) => {
                self.finish(&report).await?;
                Ok(report)
            }
            Err(aborted) => {
                error!("❌ {}", aborted);
                self.finish(&aborted.partial).await?;
                Err(aborted.into())
            }
        }
    }

    /// 加载运单行
    async fn load_rows(&self) -> Result<Vec<RawRow>> {
        info!("\n📁 正在读取批量运单文件: {}", self.config.input_file);
        load_batch_file(Path::new(&self.config.input_file)).await
    }

    /// 写出报告并输出统计
    async fn finish(&self, report: &BatchReport) -> Result<()> {
        let outputs = self.writer.write_all(report).await.context("写出报告失败")?;

        let stats = report.stats();
        if let Err(e) = append_run_summary(&self.config.output_log_file, &stats, &outputs) {
            warn!("⚠️ 写入日志文件失败: {}", e);
        }
        print_final_stats(&stats, &self.config.output_log_file);

        Ok(())
    }
}

/// Ctrl-C 时置位取消标志
fn watch_ctrl_c(cancel: CancelFlag) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹️ 收到 Ctrl-C，等待进行中的行完成后停止");
            cancel.cancel();
        }
    })
}
