pub mod address;
pub mod loaders;
pub mod parcel;
pub mod rate;
pub mod report;
pub mod shipment;

pub use address::Address;
pub use loaders::{load_batch_file, parse_batch};
pub use parcel::{DistanceUnit, MassUnit, Parcel, ParcelDefaults};
pub use rate::{LabelFileType, LabelTransaction, RateQuote};
pub use report::{BatchReport, BatchStats, RowStage, ShipmentFailure, ShipmentResult, ShipmentSuccess};
pub use shipment::{RawRow, RawValue, ShipmentRequest};
