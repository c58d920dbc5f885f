//! # Data Module
//!
//! In-memory representations of the PRG and its derived state.
//!
//! ## Sub-modules
//! - `alphabet`: the integer alphabet (DNA bases and variant markers)
//! - `prg`: the encoded PRG
//! - `masks`: position-aligned site/allele/marker masks with rank support
//! - `coverage`: the mutable per-allele coverage counters

pub mod alphabet;
pub mod coverage;
pub mod masks;
pub mod prg;

pub use alphabet::{AlleleId, Base, Marker};
pub use coverage::Coverage;
pub use masks::Masks;
pub use prg::Prg;
