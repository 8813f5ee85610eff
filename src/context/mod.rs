// src/context/mod.rs
// Market context around a zone touch: compression into the zone and stop sweeps before it.
pub mod compression;
pub mod inducement;

pub use compression::{CompressionDetector, CompressionQuality, CompressionResult, CompressionType, Trend};
pub use inducement::{
    InducementDetector, InducementQuality, InducementResult, InducementType, SweepInducementDetector,
};
