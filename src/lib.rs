//! Consolidates per-voltage frequency measurement pickles into one JSON
//! report keyed by voltage and address.

pub mod convert;
pub mod data;
pub mod error;

pub use convert::{write_report, Converter, OUTPUT_FILE_NAME};
pub use error::ConvertError;
