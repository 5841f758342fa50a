//! Response stream pipeline: wire messages to transcript entries.
//!
//! - `unit`: wire JSON to `ResponseUnit`s
//! - `proto`: protobuf wrapper unwrapping
//! - `table`: data results to `DataTable`
//! - `normalize`: `Normalizer`, units to `TranscriptEntry`s, sync and async
//! - `source`: JSON Lines readers

mod error;
mod normalize;
mod proto;
mod source;
mod table;
mod unit;


pub use error::ChatError;
pub use normalize::Normalizer;
pub use proto::to_plain;
pub use source::open;
