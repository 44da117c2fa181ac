//! # domains
//!
//! Forum entities, the closed error vocabulary, pagination primitives and the
//! port traits every adapter implements. No I/O lives here.

pub mod errors;
pub mod models;
pub mod pagination;
pub mod ports;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use pagination::*;
pub use ports::*;
