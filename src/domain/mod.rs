//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - input controls (`Span`, `Benchmark`, `CompositeWeight`, `Controls`)
//! - instrument identifiers (`Symbol`) and composite definition (`CompositeSpec`)
//! - the date-indexed tables (`PriceTable`, `ReturnTable`)

pub mod table;
pub mod types;

pub use table::*;
pub use types::*;
