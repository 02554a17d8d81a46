//! Share domain model, name validation, quota planning, and metadata codec.

pub mod metadata;
pub mod model;
pub mod name;
pub mod quota;

pub use model::{Exposure, Options, PublicShare, Share};
