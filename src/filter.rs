//! Upload admission filter

use crate::classify::OCTET_STREAM;
use crate::config::{FilterConfig, FilterMode};
use crate::{Error, Result};
use std::collections::HashSet;

/// Decides whether content of a given type may be stored
#[derive(Clone, Debug)]
pub struct FilterPolicy {
    mode: FilterMode,
    mime: HashSet<String>,
    /// Extensions with their leading dot
    ext: HashSet<String>,
}

impl FilterPolicy {
    pub fn new(mode: FilterMode, mime: &[String], ext: &[String]) -> Self {
        FilterPolicy {
            mode,
            mime: mime.iter().map(|m| m.trim().to_ascii_lowercase()).collect(),
            ext: ext
                .iter()
                .map(|e| e.trim().trim_start_matches('.'))
                .filter(|e| !e.is_empty())
                .map(|e| format!(".{}", e.to_ascii_lowercase()))
                .collect(),
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.mode, &config.mime, &config.ext)
    }

    /// First of `mime` and `extensions` present in the filter sets
    fn find_match(&self, mime: &str, extensions: &[String]) -> Option<String> {
        if self.mime.contains(mime) {
            return Some(mime.to_string());
        }
        extensions.iter().find(|e| self.ext.contains(*e)).cloned()
    }

    /// Admit or reject content classified as `mime` whose registered
    /// extensions are `extensions`.
    ///
    /// Blacklist rejects the matched value; whitelist rejects the MIME type.
    /// Under blacklist, `application/octet-stream` is only rejected when it is
    /// listed explicitly, so unclassifiable content is not blocked wholesale.
    pub fn check(&self, mime: &str, extensions: &[String]) -> Result<()> {
        let mime = mime.to_ascii_lowercase();
        let found = self.find_match(&mime, extensions);

        match (self.mode, found) {
            (FilterMode::Whitelist, None) => Err(Error::Forbidden(mime)),
            (FilterMode::Blacklist, Some(found)) => {
                if mime == OCTET_STREAM && !self.mime.contains(OCTET_STREAM) {
                    return Ok(());
                }
                Err(Error::Forbidden(found))
            }
            _ => Ok(()),
        }
    }
}
