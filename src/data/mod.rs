//! Case ingestion layer.

pub mod cases;
pub mod loader;
