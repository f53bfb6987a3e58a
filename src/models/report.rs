//! 批处理结果
//!
//! `ShipmentResult` 每行一个，`BatchReport` 按输入顺序持有全部结果，
//! 运行结束后只读。

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ErrorKind, ShipmentError};
use crate::models::shipment::RawRow;

/// 单行状态机
///
/// `Pending → Normalized → Quoted → Selected → Purchased → Retrieved`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RowStage {
    Pending,
    Normalized,
    Quoted,
    Selected,
    Purchased,
    Retrieved,
}

impl fmt::Display for RowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowStage::Pending => "pending",
            RowStage::Normalized => "normalized",
            RowStage::Quoted => "quoted",
            RowStage::Selected => "selected",
            RowStage::Purchased => "purchased",
            RowStage::Retrieved => "retrieved",
        };
        f.write_str(name)
    }
}

/// 成功行
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentSuccess {
    /// 0-based
    pub row_index: usize,
    pub row: RawRow,
    pub tracking_number: String,
    pub carrier: String,
    pub service_level: String,
    pub price: Decimal,
    pub currency: String,
    pub label_url: String,
    pub label_path: PathBuf,
}

/// 失败行
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentFailure {
    /// 0-based
    pub row_index: usize,
    pub row: RawRow,
    /// 失败前到达的最后状态
    pub last_stage: RowStage,
    /// `None` 表示批次被取消、该行未被处理
    pub error: Option<ShipmentError>,
    /// 含行号的可读信息
    pub message: String,
}

/// 单行结果
#[derive(Debug, Clone, PartialEq)]
pub enum ShipmentResult {
    Success(ShipmentSuccess),
    Error(ShipmentFailure),
}

impl ShipmentResult {
    pub fn row_index(&self) -> usize {
        match self {
            ShipmentResult::Success(s) => s.row_index,
            ShipmentResult::Error(e) => e.row_index,
        }
    }

    /// 1-based
    pub fn row_number(&self) -> usize {
        self.row_index() + 1
    }

    pub fn row(&self) -> &RawRow {
        match self {
            ShipmentResult::Success(s) => &s.row,
            ShipmentResult::Error(e) => &e.row,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ShipmentResult::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ShipmentResult::Error(e) => e.error.as_ref().map(ShipmentError::kind),
            ShipmentResult::Success(_) => None,
        }
    }
}

/// 批处理报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    results: Vec<ShipmentResult>,
    label_files: Vec<PathBuf>,
}

impl BatchReport {
    /// 由按行序排列的结果构造；面单文件列表从成功行按序导出
    pub fn from_results(results: Vec<ShipmentResult>) -> Self {
        let label_files = results
            .iter()
            .filter_map(|r| match r {
                ShipmentResult::Success(s) => Some(s.label_path.clone()),
                ShipmentResult::Error(_) => None,
            })
            .collect();

        Self {
            results,
            label_files,
        }
    }

    pub fn results(&self) -> &[ShipmentResult] {
        &self.results
    }

    /// 交给 PDF 合并方的面单文件，按行序
    pub fn label_files(&self) -> &[PathBuf] {
        &self.label_files
    }

    pub fn successes(&self) -> impl Iterator<Item = &ShipmentSuccess> {
        self.results.iter().filter_map(|r| match r {
            ShipmentResult::Success(s) => Some(s),
            ShipmentResult::Error(_) => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShipmentFailure> {
        self.results.iter().filter_map(|r| match r {
            ShipmentResult::Error(e) => Some(e),
            ShipmentResult::Success(_) => None,
        })
    }

    /// 交给错误日志方的逐行错误信息，按行序
    pub fn error_messages(&self) -> Vec<String> {
        self.failures().map(|f| f.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats {
            total: self.results.len(),
            ..Default::default()
        };

        for result in &self.results {
            match result {
                ShipmentResult::Success(s) => {
                    stats.succeeded += 1;
                    *stats.spend.entry(s.currency.clone()).or_default() += s.price;
                }
                ShipmentResult::Error(e) => {
                    stats.failed += 1;
                    match e.error.as_ref().map(ShipmentError::kind) {
                        Some(kind) => *stats.failures_by_kind.entry(kind).or_default() += 1,
                        None => stats.cancelled += 1,
                    }
                }
            }
        }

        stats
    }
}

/// 批处理统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 失败中因取消而未处理的行数
    pub cancelled: usize,
    pub failures_by_kind: BTreeMap<ErrorKind, usize>,
    /// 币种 → 总花费
    pub spend: BTreeMap<String, Decimal>,
}

/// 并发处理时按输入下标归位结果
#[derive(Debug)]
pub(crate) struct ReportAccumulator {
    slots: Vec<Option<ShipmentResult>>,
}

impl ReportAccumulator {
    pub(crate) fn new(total_rows: usize) -> Self {
        Self {
            slots: vec![None; total_rows],
        }
    }

    pub(crate) fn record(&mut self, result: ShipmentResult) {
        let index = result.row_index();
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    pub(crate) fn is_recorded(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(Option::is_some)
    }

    /// 未记录的行被跳过（仅 fail-fast 的部分报告会出现）
    pub(crate) fn into_report(self) -> BatchReport {
        BatchReport::from_results(self.slots.into_iter().flatten().collect())
    }
}

/// 面单文件名：`label_{行号}.{扩展名}`
pub fn label_file_name(row_number: usize, extension: &str) -> String {
    format!("label_{}.{}", row_number, extension)
}

/// 报告中展示用的面单路径
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(index: usize, price: i64) -> ShipmentResult {
        ShipmentResult::Success(ShipmentSuccess {
            row_index: index,
            row: RawRow::new(),
            tracking_number: format!("TRK{}", index),
            carrier: "USPS".to_string(),
            service_level: "Ground Advantage".to_string(),
            price: Decimal::from(price),
            currency: "USD".to_string(),
            label_url: format!("https://labels.example/{}.pdf", index),
            label_path: PathBuf::from(label_file_name(index + 1, "pdf")),
        })
    }

    fn failure(index: usize, error: Option<ShipmentError>) -> ShipmentResult {
        ShipmentResult::Error(ShipmentFailure {
            row_index: index,
            row: RawRow::new(),
            last_stage: RowStage::Pending,
            error,
            message: format!("row {}: failed", index + 1),
        })
    }

    #[test]
    fn test_label_files_follow_successful_rows_in_order() {
        let report = BatchReport::from_results(vec![
            success(0, 5),
            failure(
                1,
                Some(ShipmentError::Validation {
                    missing_fields: vec!["zip_to".to_string()],
                }),
            ),
            success(2, 7),
        ]);

        assert_eq!(
            report.label_files(),
            &[PathBuf::from("label_1.pdf"), PathBuf::from("label_3.pdf")]
        );
        assert_eq!(report.error_messages(), vec!["row 2: failed".to_string()]);
    }

    #[test]
    fn test_stats_count_kinds_and_spend() {
        let report = BatchReport::from_results(vec![
            success(0, 5),
            success(1, 7),
            failure(
                2,
                Some(ShipmentError::NoQualifyingRate {
                    policy: "first_available".to_string(),
                    candidates: 0,
                }),
            ),
            failure(3, None),
        ]);

        let stats = report.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.succeeded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.failures_by_kind.get(&ErrorKind::NoQualifyingRate), Some(&1));
        assert_eq!(stats.spend.get("USD"), Some(&Decimal::from(12)));
    }

    #[test]
    fn test_accumulator_restores_input_order() {
        let mut acc = ReportAccumulator::new(3);
        acc.record(success(2, 1));
        acc.record(success(0, 1));
        assert!(!acc.is_recorded(1));
        acc.record(failure(1, None));

        let report = acc.into_report();
        let order: Vec<usize> = report.results().iter().map(|r| r.row_index()).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
