//! Domain model for stored resources (uploaded files and attachments).
//!
//! # Invariants
//! - A resource `id` is assigned by storage and never reused.
//! - `creator_id` is fixed at creation; `memo_id` may be bound and unbound.

pub mod resource;
