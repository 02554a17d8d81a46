//! # sharebox-entity
//!
//! Domain entity models for Sharebox. Every struct in this crate represents
//! a stored metadata record or a domain value object. All entities derive
//! `Debug`, `Clone`, `Serialize`, and `Deserialize`, and the crate has no
//! internal dependencies. Validation, quota planning, and the metadata
//! codec are pure functions over these types.

pub mod item;
pub mod share;
