//! # SOAPLite Core Library
//!
//! Orchestration layer for computing SOAP (Smooth Overlap of Atomic Positions)
//! descriptors with the precompiled SOAPLite native modules.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout so that the pure data handling can be
//! tested without any native module present.
//!
//! - **[`core`]: The Foundation.** Stateless structure models (`AtomicStructure`, `Cell`),
//!   extended-XYZ I/O, species grouping, periodic supercell expansion and radial basis
//!   coefficients.
//!
//! - **[`engine`]: The Dispatch Core.** Parameter validation, output-buffer sizing,
//!   the [`engine::kernel::SoapKernel`] seam, and the native module loader with its
//!   process-wide handle cache.
//!
//! - **[`workflows`]: The Public API.** Local, whole-structure and periodic descriptor
//!   computations, plus a parallel batch workflow over many frames.

pub mod core;
pub mod engine;
pub mod workflows;
