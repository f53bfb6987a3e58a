pub mod label_purchaser;
pub mod label_retriever;
pub mod rate_requester;
pub mod rate_selector;
pub mod report_writer;
pub mod row_normalizer;

pub use label_purchaser::{require_purchased, LabelPurchaser};
pub use label_retriever::LabelRetriever;
pub use rate_requester::RateRequester;
pub use rate_selector::{selector_for, ExactMatch, FirstAvailable, RateSelector};
pub use report_writer::{report_rows, ReportWriter, WrittenOutputs};
pub use row_normalizer::{FieldMap, RowNormalizer};
