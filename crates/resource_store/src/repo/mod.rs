//! Repository layer for resources.
//!
//! # Responsibility
//! - Define the `ResourceStore` contract consumed by higher layers.
//! - Keep SQL construction (`query`) separate from execution and row
//!   decoding (`resource_repo`).

mod query;
pub mod resource_repo;
