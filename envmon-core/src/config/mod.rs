//! Configuration types
//!
//! Board wiring and polling policy, optionally serializable.

pub mod types;

pub use types::*;
