//! Content-addressed blob storage
//!
//! Uploads are streamed into a private temp file while being hashed, then
//! committed by renaming the temp file into its canonical location. The
//! exclusive creation of the blob's container directory decides which of
//! several concurrent committers of the same content actually writes it.

use super::{StoreLayout, BLOB_FILE};
use crate::model::ContentHash;
use crate::{Error, Result};
use sha1::{Digest, Sha1};
use std::fs::{self, File, Permissions};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::debug;

/// How long a committer that lost the directory race waits for the winner's
/// rename to land before reporting the store as inconsistent.
const SETTLE_ATTEMPTS: u32 = 50;
const SETTLE_INTERVAL: Duration = Duration::from_millis(10);

const BLOB_MODE: u32 = 0o644;

/// A fully received upload that has not been committed yet.
///
/// Dropping the session deletes its temp file.
pub struct UploadSession {
    temp: NamedTempFile,
    hash: ContentHash,
    size: u64,
}

impl UploadSession {
    /// Path of the temp file, for classification
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Result of committing a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitOutcome {
    pub hash: ContentHash,
    /// Canonical blob file path
    pub path: PathBuf,
    /// The content was already stored; the session's copy was discarded
    pub already_existed: bool,
}

/// Writer that hashes everything passing through it
struct HashingWriter<W> {
    inner: W,
    hasher: Sha1,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        HashingWriter {
            inner,
            hasher: Sha1::new(),
        }
    }

    fn finish(self) -> ContentHash {
        ContentHash::from_hasher(self.hasher)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Deduplicating blob store rooted at a [`StoreLayout`]
#[derive(Clone, Debug)]
pub struct BlobStore {
    layout: StoreLayout,
    /// 0 means unlimited
    max_size: u64,
}

impl BlobStore {
    pub fn new(layout: StoreLayout, max_size: u64) -> Self {
        BlobStore { layout, max_size }
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Stream `reader` into a temp file, hashing as it goes.
    ///
    /// At most `max_size + 1` bytes are read; getting the extra byte means
    /// the upload is too large.
    pub fn put(&self, reader: impl Read) -> Result<UploadSession> {
        let mut temp = tempfile::Builder::new()
            .prefix("file")
            .tempfile_in(self.layout.temp_dir())?;

        let mut writer = HashingWriter::new(temp.as_file_mut());
        let size = if self.max_size > 0 {
            io::copy(&mut reader.take(self.max_size.saturating_add(1)), &mut writer)?
        } else {
            let mut reader = reader;
            io::copy(&mut reader, &mut writer)?
        };

        if self.max_size > 0 && size > self.max_size {
            debug!(max_size = self.max_size, "upload exceeded size limit");
            return Err(Error::TooLarge(self.max_size));
        }

        writer.flush()?;
        let hash = writer.finish();
        Ok(UploadSession { temp, hash, size })
    }

    /// Move a session's content into the store, unless it is already there
    pub fn commit(&self, session: UploadSession) -> Result<CommitOutcome> {
        let hash = session.hash;
        let container = self.layout.blob_dir(&hash);
        let path = container.join(BLOB_FILE);

        if let Some(parent) = container.parent() {
            fs::create_dir_all(parent)?;
        }

        match fs::create_dir(&container) {
            Ok(()) => {
                if let Err(e) = session.temp.persist(&path) {
                    // leave no empty container behind, or the hash is wedged
                    let _ = fs::remove_dir(&container);
                    return Err(Error::Internal(format!(
                        "failed to move blob {} into place: {}",
                        hash, e.error
                    )));
                }
                fs::set_permissions(&path, Permissions::from_mode(BLOB_MODE))?;
                debug!(hash = %hash, "stored new blob");
                Ok(CommitOutcome {
                    hash,
                    path,
                    already_existed: false,
                })
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                self.wait_for_blob(&hash, &path)?;
                debug!(hash = %hash, "blob already stored, discarding upload copy");
                Ok(CommitOutcome {
                    hash,
                    path,
                    already_existed: true,
                })
            }
            Err(e) => Err(Error::Internal(format!(
                "failed to create blob directory for {}: {}",
                hash, e
            ))),
        }
    }

    /// Open a stored blob for reading
    pub fn open(&self, hash: &ContentHash) -> Result<File> {
        File::open(self.layout.blob_path(hash)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(hash.to_hex()),
            _ => Error::Io(e),
        })
    }

    /// Check whether a blob is stored
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.layout.blob_path(hash).is_file()
    }

    fn wait_for_blob(&self, hash: &ContentHash, path: &Path) -> Result<()> {
        for _ in 0..SETTLE_ATTEMPTS {
            if fs::metadata(path).is_ok() {
                return Ok(());
            }
            thread::sleep(SETTLE_INTERVAL);
        }
        Err(Error::Internal(format!(
            "blob directory for {} exists without a file",
            hash
        )))
    }
}
