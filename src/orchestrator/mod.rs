//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用
//! - 管理应用生命周期（初始化、运行）
//! - 持有外部服务客户端（Shippo、面单下载）
//! - 加载运单行，写出报告，输出全局统计
//!
//! ### `shipment_batch` - 批次编排器
//! - 遍历 `Vec<RawRow>`，一行一个结果，保持输入顺序
//! - 完成模式（best-effort / fail-fast）
//! - 控制并发数量（Semaphore）与取消
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (App：资源、输入、输出)
//!     ↓
//! shipment_batch (处理 Vec<RawRow>)
//!     ↓
//! workflow::ShipmentFlow (处理单行)
//!     ↓
//! services (能力层：normalize / rates / select / purchase / retrieve / report)
//!     ↓
//! clients + infrastructure (Shippo、面单下载、HTTP)
//! ```

pub mod batch_processor;
pub mod shipment_batch;

// 重新导出主要类型
pub use batch_processor::App;
pub use shipment_batch::{BatchOrchestrator, CancelFlag};
