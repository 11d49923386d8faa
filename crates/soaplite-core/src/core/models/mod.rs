//! Structure models used throughout the crate.
//!
//! An [`structure::AtomicStructure`] is an ordered list of [`atom::Atom`]s with an
//! optional [`cell::Cell`]. A structure that carries a cell is treated as periodic.

pub mod atom;
pub mod cell;
pub mod element;
pub mod structure;
