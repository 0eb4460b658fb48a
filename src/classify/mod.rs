//! Pluggable content classification
//!
//! Uploads are classified from their bytes, never from the client's file
//! name. The MIME type then selects which extensions the upload may carry.

mod registry;
mod sniff;
mod traits;

pub use registry::{pick_extension, ExtensionRegistry};
pub use sniff::SniffClassifier;
pub use traits::{Classifier, OCTET_STREAM};
