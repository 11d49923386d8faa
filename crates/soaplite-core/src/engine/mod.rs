//! # Engine Module
//!
//! Turns a species-grouped structure into a descriptor matrix by validating the request,
//! sizing the output buffer and handing everything to a [`kernel::SoapKernel`].
//!
//! - **Configuration** ([`config`]) - Descriptor parameters and their supported ranges
//! - **Dispatch** ([`dispatch`]) - Precondition checks, buffer allocation and reshaping
//! - **Descriptor Layout** ([`descriptor`]) - Feature counts and the output matrix type
//! - **Kernel Seam** ([`kernel`]) - The computation interface and its flat inputs
//! - **Native Modules** ([`native`]) - Locating, loading and caching the compiled modules
//! - **Progress Monitoring** ([`progress`]) - Batch progress events
//! - **Error Handling** ([`error`]) - The engine error type

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod kernel;
pub mod native;
pub mod progress;
