//! # upbox
//!
//! Storage core for a public file-hosting service.
//!
//! Uploads are deduplicated into a content-addressed blob store and published
//! under short random IDs, each a symlink to its blob. The filesystem is the
//! only coordination primitive, so any number of processes may share a root.
//!
//! ## Core Concepts
//!
//! - **Blobs**: immutable files keyed by the SHA-1 of their content
//! - **Aliases**: short public IDs with their own extension, pointing at a blob
//! - **Classification**: uploads are typed from their bytes, not their names
//! - **Admission filter**: a blacklist or whitelist of MIME types and extensions
//!
//! ## Example
//!
//! ```ignore
//! use upbox::Storage;
//!
//! let storage = Storage::open_root("upload")?;
//! let upload = storage.upload(std::fs::File::open("cat.png")?, "cat.png")?;
//! let served = storage.get(&upload.id)?;
//! ```

pub mod classify;
pub mod config;
pub mod event;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod response;
pub mod serve;
pub mod store;

mod error;
mod storage;

pub use classify::{Classifier, ExtensionRegistry, SniffClassifier};
pub use config::{FilterConfig, FilterMode, ServeConfig, StorageConfig};
pub use error::{Error, Result};
pub use event::{TracingSink, UploadContext, UploadEvent, UploadSink};
pub use filter::FilterPolicy;
pub use model::{ContentHash, PublicId};
pub use pipeline::{Upload, UploadPipeline};
pub use response::{UploadResponse, UploadResult};
pub use serve::{Retrieval, ServedFile};
pub use storage::Storage;
pub use store::{AliasAllocator, BlobStore, StoreLayout};
