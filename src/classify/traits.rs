//! Classifier trait definition

use crate::Result;
use std::path::Path;

/// Fallback type for content nothing more specific is known about
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Trait for detecting the MIME type of a fully written file
///
/// Implementations can use:
/// - A built-in signature table (see [`SniffClassifier`](super::SniffClassifier))
/// - A native magic database
/// - Fixed answers for testing
///
/// Any error fails the upload being classified.
pub trait Classifier: Send + Sync {
    /// Return the canonical MIME type (no parameters) of the file at `path`
    fn classify(&self, path: &Path) -> Result<String>;

    /// Get the classifier name/identifier
    fn name(&self) -> &str;
}
