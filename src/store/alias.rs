//! Short public IDs realized as symlinks into the blob store

use super::StoreLayout;
use crate::model::{extension_of, ContentHash, PublicId};
use crate::{Error, Result};
use rand::Rng;
use std::fs::{self, File};
use std::io;
use std::os::unix::fs::symlink;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Draws per allocation before the keyspace is considered exhausted
pub const MAX_ID_TRIES: usize = 64;

/// An alias resolved to its open content
#[derive(Debug)]
pub struct ResolvedAlias {
    /// The blob, opened through the symlink
    pub file: File,
    pub hash: ContentHash,
    /// Name of the alias entry, `file<ext>`
    pub name: String,
    /// Modification time of the alias entry itself
    pub modified: SystemTime,
    /// Size of the alias entry itself (the symlink, not the content)
    pub size: u64,
}

/// Mints and resolves public IDs
#[derive(Clone, Debug)]
pub struct AliasAllocator {
    layout: StoreLayout,
    charset: Vec<u8>,
    length: usize,
}

impl AliasAllocator {
    /// `charset` must be non-empty ASCII; see `StorageConfig::validate`
    pub fn new(layout: StoreLayout, charset: &str, length: usize) -> Self {
        AliasAllocator {
            layout,
            charset: charset.as_bytes().to_vec(),
            length,
        }
    }

    /// Claim a fresh ID pointing at `hash`; returns `id + extension`
    pub fn allocate(&self, hash: &ContentHash, extension: &str) -> Result<String> {
        let mut rng = rand::thread_rng();
        self.allocate_with(hash, extension, || self.random_id(&mut rng))
    }

    fn allocate_with(
        &self,
        hash: &ContentHash,
        extension: &str,
        mut draw: impl FnMut() -> String,
    ) -> Result<String> {
        for attempt in 1..=MAX_ID_TRIES {
            let id = draw();
            let dir = self.layout.alias_dir(&id);
            if let Some(parent) = dir.parent() {
                fs::create_dir_all(parent)?;
            }

            match fs::create_dir(&dir) {
                Ok(()) => {
                    let link = dir.join(format!("file{}", extension));
                    if let Err(e) = symlink(StoreLayout::blob_link_target(hash), &link) {
                        let _ = fs::remove_dir(&dir);
                        return Err(Error::Io(e));
                    }
                    return Ok(format!("{}{}", id, extension));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(id = %id, attempt, "public id taken, drawing again");
                }
                Err(e) => return Err(Error::Io(e)),
            }
        }

        warn!(
            attempts = MAX_ID_TRIES,
            length = self.length,
            "no free public id found"
        );
        Err(Error::Internal(format!(
            "no free public id after {} attempts",
            MAX_ID_TRIES
        )))
    }

    fn random_id(&self, rng: &mut impl Rng) -> String {
        (0..self.length)
            .map(|_| self.charset[rng.gen_range(0..self.charset.len())] as char)
            .collect()
    }

    /// Look up a public ID such as `qwerty.png`.
    ///
    /// Any ID that is malformed, unknown, or requested with the wrong
    /// extension is reported as `NotFound`.
    pub fn resolve(&self, public_id: &str) -> Result<ResolvedAlias> {
        let requested = PublicId::parse(public_id);
        let not_found = || Error::NotFound(public_id.to_string());

        // padding makes shorter ids share a directory with minted ones
        if requested.id.len() != self.length
            || !requested.id.bytes().all(|b| self.charset.contains(&b))
        {
            return Err(not_found());
        }

        let dir = self.layout.alias_dir(requested.id);
        let entries = fs::read_dir(&dir).map_err(|_| not_found())?;
        let mut entries = entries.collect::<io::Result<Vec<_>>>()?;
        if entries.len() != 1 {
            return Err(Error::Internal(format!(
                "alias {} has {} entries",
                requested.id,
                entries.len()
            )));
        }
        let entry = entries.remove(0);
        let name = entry
            .file_name()
            .into_string()
            .map_err(|_| Error::Internal(format!("alias {} has a non-UTF-8 entry", requested.id)))?;
        let link = entry.path();

        let target = fs::read_link(&link)
            .map_err(|e| Error::Internal(format!("alias {} is not a link: {}", requested.id, e)))?;
        let hash = target
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .and_then(ContentHash::from_path_component)
            .ok_or_else(|| {
                Error::Internal(format!(
                    "alias {} points at {}",
                    requested.id,
                    target.display()
                ))
            })?;

        if extension_of(&name) != requested.extension {
            return Err(not_found());
        }

        let meta = fs::symlink_metadata(&link)?;
        let file = File::open(&link)
            .map_err(|e| Error::Internal(format!("alias {} is dangling: {}", requested.id, e)))?;

        Ok(ResolvedAlias {
            file,
            hash,
            name,
            modified: meta.modified()?,
            size: meta.len(),
        })
    }
}
