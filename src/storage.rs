//! High-level Storage API
//!
//! This module provides the main entry point for embedding upbox in a server.

use crate::classify::{Classifier, SniffClassifier};
use crate::config::StorageConfig;
use crate::event::{UploadContext, UploadSink};
use crate::pipeline::{Upload, UploadPipeline};
use crate::response::UploadResult;
use crate::serve::{Retrieval, ServedFile};
use crate::store::StoreLayout;
use crate::Result;
use std::io::Read;
use std::path::PathBuf;

/// A storage root with its upload pipeline and retrieval path
///
/// `Storage` holds no mutable state and can be shared between request
/// handlers behind an `Arc`.
pub struct Storage {
    config: StorageConfig,
    pipeline: UploadPipeline,
    retrieval: Retrieval,
}

impl Storage {
    /// Validate `config` and create the storage layout if missing
    pub fn open(config: StorageConfig) -> Result<Self> {
        config.validate()?;
        StoreLayout::create(&config.root)?;
        Ok(Storage {
            pipeline: UploadPipeline::new(&config, SniffClassifier),
            retrieval: Retrieval::new(&config),
            config,
        })
    }

    /// Open `root` with default settings
    pub fn open_root(root: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StorageConfig::with_root(root))
    }

    /// Set the classifier used for uploads
    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.pipeline = self.pipeline.with_classifier(classifier);
        self
    }

    /// Set the sink receiving upload events
    pub fn with_sink(mut self, sink: impl UploadSink + 'static) -> Self {
        self.pipeline = self.pipeline.with_sink(sink);
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.config.root)
    }

    /// Store an upload
    pub fn upload(&self, reader: impl Read, name: &str) -> Result<Upload> {
        self.pipeline.accept(reader, name)
    }

    /// Store an upload, reporting request details to the event sink
    pub fn upload_from(
        &self,
        reader: impl Read,
        name: &str,
        context: &UploadContext,
    ) -> Result<Upload> {
        self.pipeline.accept_from(reader, name, context)
    }

    /// Result entry for an upload, with its public URL
    pub fn result_for(&self, name: &str, upload: &Upload) -> UploadResult {
        UploadResult::new(&self.config.serve.base_url, name, upload)
    }

    /// Open an upload by public ID
    pub fn get(&self, public_id: &str) -> Result<ServedFile> {
        self.retrieval.get(public_id)
    }
}
