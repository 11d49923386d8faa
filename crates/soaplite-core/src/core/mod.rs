//! # Core Module
//!
//! Data structures and pure algorithms that prepare an atomic structure for the
//! native SOAP computation.
//!
//! - **Structure Representation** ([`models`]) - Atoms, periodic cells and whole structures
//! - **File I/O** ([`io`]) - Extended-XYZ reading and writing
//! - **Species Grouping** ([`formatting`]) - Flattening positions in species-major order
//! - **Periodic Expansion** ([`supercell`]) - Re-centred supercells covering a cutoff sphere
//! - **Radial Basis** ([`basis`]) - Alpha/beta coefficients consumed by the native modules

pub mod basis;
pub mod formatting;
pub mod io;
pub mod models;
pub mod supercell;
pub mod utils;
