//! Detection wire protocol
//!
//! Each datagram carries UTF-8 text with one or more newline-delimited
//! records of nine space-separated tokens.

pub mod decoder;
pub mod detection;
pub mod record;

pub use decoder::{decode, decode_payload, split_records, PayloadDecode};
pub use detection::{BoundingBox, Detection, Extent, Heading, Position};
pub use record::WireRecord;
