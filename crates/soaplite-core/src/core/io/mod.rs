//! Reading and writing atomic structures.
//!
//! Formats implement the [`traits::StructureFile`] trait, which provides path-based
//! convenience methods on top of reader/writer based parsing and serialization.

pub mod traits;
pub mod xyz;
