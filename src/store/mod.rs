//! On-disk storage: content-addressed blobs and symlink aliases
//!
//! Layout under the storage root:
//! ```text
//! temp/                                   scratch files for in-flight uploads
//! files/<h0>/<h1h2>/<hash>/file           one blob per distinct content hash
//! ids/<i0>/<i1i2>/<id>/file<ext>          alias symlink -> ../../../../files/...
//! ```
//!
//! Hashes are url-safe base64. Keys shorter than four characters are
//! left-padded with `_` before sharding so every key has all three components.
//! Creating a container directory is the only concurrency primitive: whoever
//! creates it owns the slot.

mod alias;
mod blob;

pub use alias::{AliasAllocator, ResolvedAlias, MAX_ID_TRIES};
pub use blob::{BlobStore, CommitOutcome, UploadSession};

use crate::model::ContentHash;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMP_DIR: &str = "temp";
pub const FILES_DIR: &str = "files";
pub const IDS_DIR: &str = "ids";
/// Name of the blob file inside its container directory
pub const BLOB_FILE: &str = "file";

const SHARD_PAD: char = '_';
const SHARD_MIN_LEN: usize = 4;

/// Paths of a storage root
#[derive(Clone, Debug)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Wrap an existing root without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StoreLayout { root: root.into() }
    }

    /// Create the root and its three areas if missing
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self::new(root);
        for dir in [layout.temp_dir(), layout.files_dir(), layout.ids_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join(FILES_DIR)
    }

    pub fn ids_dir(&self) -> PathBuf {
        self.root.join(IDS_DIR)
    }

    /// Container directory of a blob
    pub fn blob_dir(&self, hash: &ContentHash) -> PathBuf {
        self.files_dir().join(shard_path(&hash.to_path_component()))
    }

    /// Canonical blob file path
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.blob_dir(hash).join(BLOB_FILE)
    }

    /// Container directory of an alias (without extension)
    pub fn alias_dir(&self, id: &str) -> PathBuf {
        self.ids_dir().join(shard_path(id))
    }

    /// Symlink target stored in an alias directory.
    ///
    /// Alias and blob containers sit at the same depth, so the target is
    /// always four levels up and back down into `files/`.
    pub fn blob_link_target(hash: &ContentHash) -> PathBuf {
        Path::new("../../../..")
            .join(FILES_DIR)
            .join(shard_path(&hash.to_path_component()))
            .join(BLOB_FILE)
    }
}

/// `<k0>/<k1k2>/<key>` with the key padded to at least four characters
fn shard_path(key: &str) -> PathBuf {
    let mut padded = String::with_capacity(SHARD_MIN_LEN.max(key.len()));
    for _ in key.chars().count()..SHARD_MIN_LEN {
        padded.push(SHARD_PAD);
    }
    padded.push_str(key);

    let mut chars = padded.char_indices().map(|(i, _)| i).skip(1);
    let first = chars.next().unwrap_or(padded.len());
    let third = chars.nth(1).unwrap_or(padded.len());

    Path::new(&padded[..first])
        .join(&padded[first..third])
        .join(&padded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_shard_path_regular_key() {
        assert_eq!(shard_path("abcdef"), PathBuf::from("a/bc/abcdef"));
    }

    #[test]
    fn test_shard_path_pads_short_keys() {
        assert_eq!(shard_path("x"), PathBuf::from("_/__/___x"));
        assert_eq!(shard_path("xy"), PathBuf::from("_/_x/__xy"));
        assert_eq!(shard_path("xyz"), PathBuf::from("_/xy/_xyz"));
        assert_eq!(shard_path("wxyz"), PathBuf::from("w/xy/wxyz"));
    }

    #[test]
    fn test_blob_path_layout() {
        let layout = StoreLayout::new("/data");
        let hash = ContentHash::digest(b"hello world");
        let component = hash.to_path_component();
        let expected = PathBuf::from("/data/files")
            .join(&component[..1])
            .join(&component[1..3])
            .join(&component)
            .join("file");
        assert_eq!(layout.blob_path(&hash), expected);
    }

    #[test]
    fn test_link_target_resolves_from_alias_dir() {
        let layout = StoreLayout::new("/data");
        let hash = ContentHash::digest(b"x");
        let alias_dir = layout.alias_dir("qwerty");
        let joined = alias_dir.join(StoreLayout::blob_link_target(&hash));

        // normalize the `..` components by hand
        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                std::path::Component::ParentDir => {
                    normalized.pop();
                }
                other => normalized.push(other),
            }
        }
        assert_eq!(normalized, layout.blob_path(&hash));
    }

    #[test]
    fn test_create_makes_areas() {
        let dir = tempdir().unwrap();
        let layout = StoreLayout::create(dir.path().join("root")).unwrap();
        assert!(layout.temp_dir().is_dir());
        assert!(layout.files_dir().is_dir());
        assert!(layout.ids_dir().is_dir());
        // idempotent
        StoreLayout::create(layout.root()).unwrap();
    }
}
