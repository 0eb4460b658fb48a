//! Core data model for upbox

mod hash;
mod id;

pub use hash::ContentHash;
pub use id::{extension_of, PublicId};
