//! # Workflows Module
//!
//! High-level entry points that take an [`AtomicStructure`](crate::core::models::structure::AtomicStructure)
//! all the way to a [`SoapDescriptor`](crate::engine::descriptor::SoapDescriptor).
//!
//! - **Descriptor Workflows** ([`soap`]) - Local and whole-structure descriptors for finite
//!   and periodic structures, and a parallel batch workflow over trajectory frames.

pub mod soap;
