//! Content hash type using SHA-1

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha1::{Digest, Sha1};
use std::fmt;

/// A 20-byte SHA-1 hash used for content addressing
///
/// On disk the hash is rendered as unpadded url-safe base64; externally
/// (ETags, upload results) it is shown as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 20]);

impl ContentHash {
    /// Create a hash from raw bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        ContentHash(bytes)
    }

    /// Hash arbitrary data
    pub fn digest(data: &[u8]) -> Self {
        ContentHash(Sha1::digest(data).into())
    }

    /// Finish a running hasher
    pub fn from_hasher(hasher: Sha1) -> Self {
        ContentHash(hasher.finalize().into())
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(ContentHash(arr))
    }

    /// Path component form: url-safe base64 without padding (27 chars)
    pub fn to_path_component(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse the path component form back into a hash
    pub fn from_path_component(s: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(s).ok()?;
        let arr: [u8; 20] = bytes.try_into().ok()?;
        Some(ContentHash(arr))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", &self.to_hex()[..7])
    }
}

impl AsRef<[u8]> for ContentHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
