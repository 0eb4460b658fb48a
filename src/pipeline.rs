//! Upload pipeline: receive → classify → filter → commit → alias
//!
//! The pipeline is the only writer of a storage root. It holds no locks;
//! concurrent uploads coordinate purely through the blob and alias stores'
//! exclusive directory creation.

use crate::classify::{pick_extension, Classifier, ExtensionRegistry};
use crate::config::StorageConfig;
use crate::event::{UploadContext, UploadEvent, UploadSink};
use crate::filter::FilterPolicy;
use crate::model::ContentHash;
use crate::store::{AliasAllocator, BlobStore, StoreLayout};
use crate::{Error, Result};
use chrono::Utc;
use std::io::Read;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A stored upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    /// Public ID including extension
    pub id: String,
    pub hash: ContentHash,
    pub size: u64,
    /// Type reported by the classifier
    pub mime: String,
    /// The content was already stored by an earlier upload
    pub deduplicated: bool,
}

/// Accepts uploads into a storage root
pub struct UploadPipeline {
    blobs: BlobStore,
    aliases: AliasAllocator,
    registry: ExtensionRegistry,
    filter: FilterPolicy,
    classifier: Arc<dyn Classifier>,
    sink: Option<Arc<dyn UploadSink>>,
}

impl UploadPipeline {
    /// Build a pipeline over `config.root`; the layout must already exist
    pub fn new(config: &StorageConfig, classifier: impl Classifier + 'static) -> Self {
        let layout = StoreLayout::new(&config.root);
        UploadPipeline {
            blobs: BlobStore::new(layout.clone(), config.max_size),
            aliases: AliasAllocator::new(layout, &config.id_charset, config.id_length),
            registry: ExtensionRegistry::new(&config.extra_types),
            filter: FilterPolicy::from_config(&config.filter),
            classifier: Arc::new(classifier),
            sink: None,
        }
    }

    /// Replace the classifier
    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Report successful uploads to `sink`
    pub fn with_sink(mut self, sink: impl UploadSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Store `reader`'s content under a freshly minted public ID
    pub fn accept(&self, reader: impl Read, suggested_name: &str) -> Result<Upload> {
        self.accept_from(reader, suggested_name, &UploadContext::default())
    }

    /// Like [`accept`](Self::accept), with request details for the upload event
    pub fn accept_from(
        &self,
        reader: impl Read,
        suggested_name: &str,
        context: &UploadContext,
    ) -> Result<Upload> {
        // the session owns the temp file until commit; every early return drops it
        let session = self.blobs.put(reader)?;

        let mime = self.classifier.classify(session.path()).map_err(|e| {
            Error::Internal(format!(
                "{} classifier failed on upload: {}",
                self.classifier.name(),
                e
            ))
        })?;

        let extensions = self.registry.extensions_for(&mime);
        let extension = pick_extension(&extensions, suggested_name);
        debug!(mime = %mime, extension = %extension, "classified upload");

        if let Err(e) = self.filter.check(&mime, &extensions) {
            warn!(mime = %mime, name = %suggested_name, error = %e, "upload rejected");
            return Err(e);
        }

        let size = session.size();
        let outcome = self.blobs.commit(session)?;
        let id = self.aliases.allocate(&outcome.hash, &extension)?;

        info!(
            id = %id,
            hash = %outcome.hash,
            size,
            mime = %mime,
            deduplicated = outcome.already_existed,
            "stored upload"
        );

        if let Some(sink) = &self.sink {
            sink.record(&UploadEvent {
                timestamp: Utc::now(),
                remote_addr: context.remote_addr.clone(),
                user_agent: context.user_agent.clone(),
                referer: context.referer.clone(),
                original_name: suggested_name.to_string(),
                id: id.clone(),
                hash: outcome.hash.to_hex(),
                size,
            });
        }

        Ok(Upload {
            id,
            hash: outcome.hash,
            size,
            mime,
            deduplicated: outcome.already_existed,
        })
    }
}
