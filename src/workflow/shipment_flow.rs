//! 运单处理流程 - 流程层
//!
//! 核心职责：定义"一行运单"的完整处理流程
//!
//! 流程顺序：
//! 1. 规范化 → 2. 询价 → 3. 选价 → 4. 购买 → 5. 下载面单
//!
//! 任一步失败即停止，该行以 `ShipmentResult::Error` 结束。

use futures::FutureExt;
use rust_decimal::Decimal;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clients::{LabelHost, ShippingGateway};
use crate::config::Config;
use crate::error::ShipmentError;
use crate::models::report::label_file_name;
use crate::models::{RawRow, RowStage, ShipmentFailure, ShipmentResult, ShipmentSuccess};
use crate::services::{
    require_purchased, selector_for, LabelPurchaser, LabelRetriever, RateRequester, RateSelector,
    RowNormalizer,
};
use crate::workflow::row_ctx::RowCtx;

/// 取消时未处理行的错误信息
pub const CANCELLED_MESSAGE: &str = "batch cancelled before this row was processed";

/// 一行走完全部阶段后的产物
struct LabelOutcome {
    tracking_number: String,
    carrier: String,
    service_level: String,
    price: Decimal,
    currency: String,
    label_url: String,
    label_path: PathBuf,
}

/// 运单处理流程
///
/// - 编排单行的五个阶段
/// - 不持有任何批次状态，可在并发任务间共享
/// - 只依赖业务能力（services）
pub struct ShipmentFlow {
    normalizer: RowNormalizer,
    requester: RateRequester,
    selector: Box<dyn RateSelector>,
    purchaser: LabelPurchaser,
    retriever: LabelRetriever,
    verbose_logging: bool,
}

impl ShipmentFlow {
    /// 创建运单处理流程
    ///
    /// # 参数
    /// - `config`: 配置
    /// - `gateway`: 运价服务（询价与购买）
    /// - `host`: 面单下载
    pub fn new(config: &Config, gateway: Arc<dyn ShippingGateway>, host: Arc<dyn LabelHost>) -> Self {
        Self {
            normalizer: RowNormalizer::new(&config.pipeline),
            requester: RateRequester::new(gateway.clone(), config.request_timeout()),
            selector: selector_for(&config.pipeline.rate_policy),
            purchaser: LabelPurchaser::new(gateway, config.label_file_type, config.request_timeout()),
            retriever: LabelRetriever::new(host, &config.labels_dir, config.label_timeout()),
            verbose_logging: config.verbose_logging,
        }
    }

    pub fn normalizer(&self) -> &RowNormalizer {
        &self.normalizer
    }

    /// 为一行构建上下文
    pub fn context(&self, row_index: usize, row: &RawRow) -> RowCtx {
        RowCtx::new(row_index, self.normalizer.recipient_name(row))
    }

    /// 处理一行，总是返回该行的结果
    ///
    /// 任一阶段 panic 也在此捕获，记为 `ShipmentError::Internal`
    pub async fn run(&self, row_index: usize, row: RawRow) -> ShipmentResult {
        let ctx = self.context(row_index, &row);
        let mut stage = RowStage::Pending;

        let caught = AssertUnwindSafe(self.execute(&ctx, &row, &mut stage))
            .catch_unwind()
            .await;
        let outcome = caught.unwrap_or_else(|payload| {
            Err(ShipmentError::Internal {
                stage: stage.to_string(),
                detail: panic_detail(payload.as_ref()),
            })
        });

        match outcome {
            Ok(outcome) => {
                info!(
                    "{} ✅ 完成: {} {} | 运单号 {} | {} {}",
                    ctx.tag(),
                    outcome.carrier,
                    outcome.service_level,
                    outcome.tracking_number,
                    outcome.price,
                    outcome.currency
                );
                ShipmentResult::Success(ShipmentSuccess {
                    row_index,
                    row,
                    tracking_number: outcome.tracking_number,
                    carrier: outcome.carrier,
                    service_level: outcome.service_level,
                    price: outcome.price,
                    currency: outcome.currency,
                    label_url: outcome.label_url,
                    label_path: outcome.label_path,
                })
            }
            Err(err) => {
                if matches!(err, ShipmentError::Retrieval { .. }) {
                    error!("{} ❌ 面单已购买但下载失败，需人工处理: {}", ctx.tag(), err);
                } else if matches!(err, ShipmentError::Internal { .. }) {
                    error!("{} 💥 处理中断: {}", ctx.tag(), err);
                } else {
                    warn!("{} ⚠️ 在 {} 阶段后失败: {}", ctx.tag(), stage, err);
                }
                ShipmentResult::Error(ShipmentFailure {
                    row_index,
                    row,
                    last_stage: stage,
                    message: format!("{}: {}", ctx, err),
                    error: Some(err),
                })
            }
        }
    }

    /// 批次取消时，为未调度的行生成结果
    pub fn cancelled(&self, row_index: usize, row: RawRow) -> ShipmentResult {
        let ctx = self.context(row_index, &row);
        ShipmentResult::Error(ShipmentFailure {
            row_index,
            row,
            last_stage: RowStage::Pending,
            error: None,
            message: format!("{}: {}", ctx, CANCELLED_MESSAGE),
        })
    }

    async fn execute(
        &self,
        ctx: &RowCtx,
        row: &RawRow,
        stage: &mut RowStage,
    ) -> Result<LabelOutcome, ShipmentError> {
        // ========== 1. 规范化 ==========
        let request = self.normalizer.normalize(row)?;
        *stage = RowStage::Normalized;
        debug!(
            "{} 规范化完成: {} → {}",
            ctx.tag(),
            request.origin().zip,
            request.destination().zip
        );

        // ========== 2. 询价 ==========
        let quotes = self.requester.request(&request).await?;
        *stage = RowStage::Quoted;
        info!("{} 🔍 收到 {} 个报价", ctx.tag(), quotes.len());
        if self.verbose_logging {
            for quote in &quotes {
                info!("{}   {}", ctx.tag(), quote);
            }
        }

        // ========== 3. 选价 ==========
        let rate = self.selector.select(&quotes)?;
        *stage = RowStage::Selected;
        info!("{} 🎯 选定报价: {}", ctx.tag(), rate);

        // ========== 4. 购买 ==========
        let transaction = self.purchaser.purchase(rate).await?;
        let (tracking_number, label_url) = require_purchased(rate, transaction)?;
        *stage = RowStage::Purchased;
        info!("{} 💳 购买成功，运单号 {}", ctx.tag(), tracking_number);

        // ========== 5. 下载面单 ==========
        let file_name = label_file_name(ctx.row_number(), self.purchaser.file_type().extension());
        let label_path = self
            .retriever
            .retrieve(&label_url, &file_name, &tracking_number)
            .await?;
        *stage = RowStage::Retrieved;
        info!("{} 📥 面单已保存: {}", ctx.tag(), label_path.display());

        Ok(LabelOutcome {
            tracking_number,
            carrier: rate.provider.clone(),
            service_level: rate.service_level.clone(),
            price: rate.amount,
            currency: rate.currency.clone(),
            label_url,
            label_path,
        })
    }
}

/// 提取 panic 信息
pub(crate) fn panic_detail(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", text)
    } else if let Some(text) = payload.downcast_ref::<String>() {
        format!("panicked: {}", text)
    } else {
        "panicked".to_string()
    }
}
