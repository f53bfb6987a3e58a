//! # Bulk Labels
//!
//! 批量运单面单采购：读取一批运单行，逐行询价、选价、购买并下载面单
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - HTTP 客户端构建
//! - `clients/` - `ShippingGateway`（询价 + 购买）与 `LabelHost`（面单下载）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单行
//! - `RowNormalizer` - 原始行 → `ShipmentRequest`
//! - `RateRequester` / `RateSelector` - 询价与选价
//! - `LabelPurchaser` / `LabelRetriever` - 购买与下载
//! - `ReportWriter` - 结果表 / 错误日志 / 面单列表
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一行运单"的完整处理流程
//! - `RowCtx` - 上下文封装（行号 + 收件人）
//! - `ShipmentFlow` - 流程编排（normalize → quote → select → purchase → retrieve）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 应用，管理资源、输入与输出
//! - `orchestrator/shipment_batch` - 批次编排器，管理完成模式、并发与取消
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{HttpLabelHost, LabelHost, ShippingGateway, ShippoClient};
pub use config::{CompletionMode, Config, PipelineConfig, RatePolicy};
pub use error::{AppError, AppResult, BatchAborted, ErrorKind, ShipmentError};
pub use models::{BatchReport, RawRow, ShipmentResult};
pub use orchestrator::{App, BatchOrchestrator, CancelFlag};
pub use workflow::{RowCtx, ShipmentFlow};
