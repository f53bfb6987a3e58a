//! 批次编排器 - 编排层
//!
//! ## 职责
//!
//! 把整批运单行交给 `ShipmentFlow`，保证：
//!
//! 1. **一行一结果**：结果数 = 输入行数（fail-fast 中止时除外），按输入顺序排列
//! 2. **完成模式**：best-effort 记录失败后继续；fail-fast 在第一行失败后停止调度
//! 3. **并发**：`max_concurrent_rows > 1` 时用 Semaphore 限流，结果按下标归位
//! 4. **取消**：已开始的行走完，未调度的行记为取消

use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::{error, info, warn};

use crate::clients::{LabelHost, ShippingGateway};
use crate::config::{CompletionMode, Config};
use crate::error::{BatchAborted, ShipmentError};
use crate::models::report::ReportAccumulator;
use crate::models::{BatchReport, RawRow, RowStage, ShipmentFailure, ShipmentResult};
use crate::workflow::shipment_flow::panic_detail;
use crate::workflow::ShipmentFlow;

/// 取消标志
///
/// 克隆后共享同一个标志；置位后不再调度新的行
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 批次编排器
pub struct BatchOrchestrator {
    flow: Arc<ShipmentFlow>,
    mode: CompletionMode,
    max_concurrent: usize,
}

impl BatchOrchestrator {
    /// 按配置创建
    pub fn new(config: &Config, gateway: Arc<dyn ShippingGateway>, host: Arc<dyn LabelHost>) -> Self {
        Self::from_flow(
            ShipmentFlow::new(config, gateway, host),
            config.completion_mode,
            config.max_concurrent_rows,
        )
    }

    /// # 参数
    /// - `flow`: 单行处理流程
    /// - `mode`: 完成模式
    /// - `max_concurrent`: 同时处理的行数（0 按 1 处理）
    pub fn from_flow(flow: ShipmentFlow, mode: CompletionMode, max_concurrent: usize) -> Self {
        Self {
            flow: Arc::new(flow),
            mode,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn flow(&self) -> &ShipmentFlow {
        &self.flow
    }

    /// 处理整批
    ///
    /// # 返回
    /// - `Ok(BatchReport)`：每个输入行一个结果
    /// - `Err(BatchAborted)`：fail-fast 模式下有行失败，携带已完成行的部分报告
    pub async fn run(&self, rows: Vec<RawRow>, cancel: &CancelFlag) -> Result<BatchReport, BatchAborted> {
        info!("\n{}", "=".repeat(60));
        info!(
            "📦 开始处理 {} 行 | 并发 {} | 模式 {}",
            rows.len(),
            self.max_concurrent,
            self.mode
        );
        info!("{}", "=".repeat(60));

        let outcome = if self.max_concurrent > 1 {
            self.run_concurrent(rows, cancel).await
        } else {
            self.run_sequential(rows, cancel).await
        };

        match &outcome {
            Ok(report) => {
                let stats = report.stats();
                info!("\n{}", "─".repeat(60));
                info!("✓ 批次完成: 成功 {}/{}", stats.succeeded, stats.total);
                info!("{}", "─".repeat(60));
            }
            Err(aborted) => {
                error!(
                    "🛑 fail-fast: 第 {} 行失败，批次中止（已完成 {} 行）",
                    aborted.row,
                    aborted.partial.len()
                );
            }
        }

        outcome
    }

    // ========== 顺序处理 ==========

    async fn run_sequential(
        &self,
        rows: Vec<RawRow>,
        cancel: &CancelFlag,
    ) -> Result<BatchReport, BatchAborted> {
        let mut results = Vec::with_capacity(rows.len());
        let mut cancel_logged = false;

        for (index, row) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                if !cancel_logged {
                    warn!("⏹️ 批次已取消，第 {} 行起不再处理", index + 1);
                    cancel_logged = true;
                }
                results.push(self.flow.cancelled(index, row));
                continue;
            }

            let result = self.flow.run(index, row).await;
            let abort_cause = self.abort_cause(&result);
            results.push(result);

            if let Some(cause) = abort_cause {
                return Err(BatchAborted {
                    row: index + 1,
                    cause,
                    partial: BatchReport::from_results(results),
                });
            }
        }

        Ok(BatchReport::from_results(results))
    }

    // ========== 并发处理 ==========

    async fn run_concurrent(
        &self,
        rows: Vec<RawRow>,
        cancel: &CancelFlag,
    ) -> Result<BatchReport, BatchAborted> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let (tx, mut rx) = mpsc::unbounded_channel::<ShipmentResult>();
        let mut accumulator = ReportAccumulator::new(rows.len());
        let mut first_failure: Option<(usize, ShipmentError)> = None;
        let mut handles = Vec::new();
        let mut cancel_logged = false;

        for (index, row) in rows.into_iter().enumerate() {
            if cancel.is_cancelled() {
                if !cancel_logged {
                    warn!("⏹️ 批次已取消，第 {} 行起不再调度", index + 1);
                    cancel_logged = true;
                }
                accumulator.record(self.flow.cancelled(index, row));
                continue;
            }

            // 信号量从不关闭
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                accumulator.record(self.flow.cancelled(index, row));
                continue;
            };

            // 任务先发送结果再释放许可，拿到许可时已完成的行都能收到
            while let Ok(result) = rx.try_recv() {
                self.absorb(result, &mut accumulator, &mut first_failure);
            }

            if first_failure.is_some() {
                drop(permit);
                break;
            }
            if cancel.is_cancelled() {
                drop(permit);
                if !cancel_logged {
                    warn!("⏹️ 批次已取消，第 {} 行起不再调度", index + 1);
                    cancel_logged = true;
                }
                accumulator.record(self.flow.cancelled(index, row));
                continue;
            }

            let flow = Arc::clone(&self.flow);
            let tx = tx.clone();
            let task_row = row.clone();
            let handle = tokio::spawn(async move {
                let _permit = permit;
                let result = flow.run(index, task_row).await;
                let _ = tx.send(result);
            });
            handles.push((index, row, handle));
        }

        drop(tx);

        let (meta, tasks): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(index, row, handle)| ((index, row), handle))
            .unzip();
        let joined = join_all(tasks).await;

        while let Some(result) = rx.recv().await {
            self.absorb(result, &mut accumulator, &mut first_failure);
        }

        for ((index, row), outcome) in meta.into_iter().zip(joined) {
            if let Err(e) = outcome {
                if accumulator.is_recorded(index) {
                    continue;
                }
                error!("[第 {} 行] 任务执行失败: {}", index + 1, e);
                let detail = match e.try_into_panic() {
                    Ok(payload) => panic_detail(payload.as_ref()),
                    Err(e) => format!("row task aborted: {}", e),
                };
                let err = ShipmentError::Internal {
                    stage: RowStage::Pending.to_string(),
                    detail,
                };
                let ctx = self.flow.context(index, &row);
                let failure = ShipmentResult::Error(ShipmentFailure {
                    row_index: index,
                    row,
                    last_stage: RowStage::Pending,
                    message: format!("{}: {}", ctx, err),
                    error: Some(err),
                });
                self.absorb(failure, &mut accumulator, &mut first_failure);
            }
        }

        let report = accumulator.into_report();
        match first_failure {
            Some((index, cause)) => Err(BatchAborted {
                row: index + 1,
                cause,
                partial: report,
            }),
            None => Ok(report),
        }
    }

    /// 记录一个结果；fail-fast 模式下保留行号最小的失败
    fn absorb(
        &self,
        result: ShipmentResult,
        accumulator: &mut ReportAccumulator,
        first_failure: &mut Option<(usize, ShipmentError)>,
    ) {
        if let Some(cause) = self.abort_cause(&result) {
            let index = result.row_index();
            if first_failure.as_ref().map_or(true, |(seen, _)| index < *seen) {
                *first_failure = Some((index, cause));
            }
        }
        accumulator.record(result);
    }

    /// fail-fast 模式下，失败行即中止原因
    fn abort_cause(&self, result: &ShipmentResult) -> Option<ShipmentError> {
        if self.mode != CompletionMode::FailFast {
            return None;
        }
        match result {
            ShipmentResult::Error(failure) => failure.error.clone(),
            ShipmentResult::Success(_) => None,
        }
    }
}
