//! Item entity model.

pub mod model;

pub use model::{Item, ItemInfo};
