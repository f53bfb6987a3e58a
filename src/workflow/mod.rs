pub mod row_ctx;
pub mod shipment_flow;

pub use row_ctx::RowCtx;
pub use shipment_flow::{ShipmentFlow, CANCELLED_MESSAGE};
