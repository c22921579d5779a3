//! mgmt: publish live objects under hierarchical names and reach their
//! attributes and operations by name at runtime.
//!
//! This crate re-exports the public API of `mgmt-core`.

pub use mgmt_core::*;
