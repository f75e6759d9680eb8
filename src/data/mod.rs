/// Data layer: discovery, decoding, and the report model.
///
/// Architecture:
/// ```text
///   input dir (*.pickle*)
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  list dir → sorted candidate paths
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  unpickle (dict order kept) → Measurement
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ FrequencyReport │  voltage → address → frequency
///   └────────────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod pickled;
pub mod voltage;
