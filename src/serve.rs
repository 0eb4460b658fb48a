//! Retrieval: public ID → open content plus serving headers

use crate::classify::OCTET_STREAM;
use crate::config::{ServeConfig, StorageConfig};
use crate::model::ContentHash;
use crate::store::{AliasAllocator, StoreLayout};
use crate::Result;
use chrono::{DateTime, Duration, Utc};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fs::File;
use std::time::SystemTime;

/// Everything but unreserved characters, as in URL query escaping
const FILENAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Cap for the `Expires` offset, about 100 years
const MAX_EXPIRES_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Resolves public IDs for serving; never writes
#[derive(Clone, Debug)]
pub struct Retrieval {
    aliases: AliasAllocator,
    serve: ServeConfig,
}

/// An open file ready to be streamed to a client
#[derive(Debug)]
pub struct ServedFile {
    pub file: File,
    pub hash: ContentHash,
    /// Alias entry name, `file<ext>`
    pub name: String,
    pub modified: SystemTime,
    /// Length of the content, from the opened file
    pub content_length: u64,
    pub content_type: String,
    csp: Option<String>,
    max_age_secs: u64,
}

impl Retrieval {
    pub fn new(config: &StorageConfig) -> Self {
        let layout = StoreLayout::new(&config.root);
        Retrieval {
            aliases: AliasAllocator::new(layout, &config.id_charset, config.id_length),
            serve: config.serve.clone(),
        }
    }

    /// Open the content behind `public_id`
    pub fn get(&self, public_id: &str) -> Result<ServedFile> {
        let resolved = self.aliases.resolve(public_id)?;
        // the resolved size describes the symlink, not the content
        let content_length = resolved.file.metadata()?.len();
        let content_type = content_type_for(&resolved.name, self.serve.allow_html);

        Ok(ServedFile {
            file: resolved.file,
            hash: resolved.hash,
            name: resolved.name,
            modified: resolved.modified,
            content_length,
            content_type,
            csp: self.serve.csp.clone().filter(|csp| !csp.is_empty()),
            max_age_secs: self.serve.max_age_secs,
        })
    }
}

impl ServedFile {
    /// `ETag` value
    pub fn etag(&self) -> String {
        format!("\"sha1:{}\"", self.hash.to_hex())
    }

    /// `Content-Disposition` value with a quoted and an RFC 5987 filename
    pub fn content_disposition(&self) -> String {
        format!(
            "inline; filename=\"{}\"; filename*=UTF-8''{}",
            self.name.replace('"', "\\\""),
            utf8_percent_encode(&self.name, FILENAME_ESCAPE)
        )
    }

    /// Response headers for serving this file at time `now`
    pub fn headers(&self, now: DateTime<Utc>) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.content_length.to_string()),
        ];
        if let Some(csp) = &self.csp {
            headers.push(("Content-Security-Policy", csp.clone()));
        }
        let max_age = self.max_age_secs.min(MAX_EXPIRES_SECS) as i64;
        let expires = now
            .checked_add_signed(Duration::seconds(max_age))
            .unwrap_or(now);
        headers.extend([
            ("X-Content-Type-Options", "nosniff".to_string()),
            ("Last-Modified", http_date(DateTime::<Utc>::from(self.modified))),
            ("Expires", http_date(expires)),
            ("Cache-Control", format!("max-age={}", self.max_age_secs)),
            ("Content-Disposition", self.content_disposition()),
            ("ETag", self.etag()),
        ]);
        headers
    }
}

/// Content type served for an alias entry, from its extension.
///
/// (X)HTML is served as plain text unless explicitly allowed.
pub fn content_type_for(name: &str, allow_html: bool) -> String {
    let mime = mime_guess::from_path(name)
        .first_raw()
        .unwrap_or(OCTET_STREAM);
    if !allow_html && (mime.starts_with("text/html") || mime.starts_with("application/xhtml+xml"))
    {
        return "text/plain".to_string();
    }
    mime.to_string()
}

/// RFC 7231 IMF-fixdate
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SniffClassifier;
    use crate::pipeline::UploadPipeline;
    use crate::Error;
    use chrono::TimeZone;
    use std::io::{Cursor, Read};
    use tempfile::tempdir;

    fn header<'a>(headers: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("file.png", false), "image/png");
        assert_eq!(content_type_for("file.txt", false), "text/plain");
        assert_eq!(content_type_for("file.html", false), "text/plain");
        assert_eq!(content_type_for("file.html", true), "text/html");
        assert_eq!(content_type_for("file.xhtml", false), "text/plain");
        assert_eq!(content_type_for("file", false), OCTET_STREAM);
    }

    #[test]
    fn test_http_date() {
        let t = Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap();
        assert_eq!(http_date(t), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_get_and_headers() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::with_root(dir.path());
        StoreLayout::create(&config.root).unwrap();
        let pipeline = UploadPipeline::new(&config, SniffClassifier);
        let upload = pipeline
            .accept(Cursor::new(b"served text".to_vec()), "note.txt")
            .unwrap();

        let retrieval = Retrieval::new(&config);
        let mut served = retrieval.get(&upload.id).unwrap();
        assert_eq!(served.hash, upload.hash);
        assert_eq!(served.name, "file.txt");
        assert_eq!(served.content_length, 11);

        let mut body = Vec::new();
        served.file.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"served text");

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let headers = served.headers(now);
        assert_eq!(header(&headers, "Content-Type"), Some("text/plain"));
        assert_eq!(header(&headers, "Content-Length"), Some("11"));
        assert_eq!(header(&headers, "X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(header(&headers, "Cache-Control"), Some("max-age=2592000"));
        assert_eq!(
            header(&headers, "Expires"),
            Some("Wed, 31 Jan 2024 00:00:00 GMT")
        );
        assert_eq!(
            header(&headers, "Content-Security-Policy"),
            Some("default-src 'none'; media-src 'self'")
        );
        let etag = format!("\"sha1:{}\"", ContentHash::digest(b"served text").to_hex());
        assert_eq!(header(&headers, "ETag"), Some(etag.as_str()));
        assert_eq!(
            header(&headers, "Content-Disposition"),
            Some("inline; filename=\"file.txt\"; filename*=UTF-8''file.txt")
        );
    }

    #[test]
    fn test_csp_disabled() {
        let dir = tempdir().unwrap();
        let mut config = StorageConfig::with_root(dir.path());
        config.serve.csp = None;
        StoreLayout::create(&config.root).unwrap();
        let upload = UploadPipeline::new(&config, SniffClassifier)
            .accept(Cursor::new(b"no csp".to_vec()), "x.txt")
            .unwrap();

        let served = Retrieval::new(&config).get(&upload.id).unwrap();
        assert_eq!(header(&served.headers(Utc::now()), "Content-Security-Policy"), None);
    }

    #[test]
    fn test_get_unknown() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::with_root(dir.path());
        StoreLayout::create(&config.root).unwrap();
        let err = Retrieval::new(&config).get("nosuch.txt").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_content_disposition_escaping() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"").unwrap();
        let served = ServedFile {
            file: File::open(&path).unwrap(),
            hash: ContentHash::digest(b""),
            name: "a \"b\" é.txt".to_string(),
            modified: SystemTime::now(),
            content_length: 0,
            content_type: "text/plain".to_string(),
            csp: None,
            max_age_secs: 60,
        };
        assert_eq!(
            served.content_disposition(),
            "inline; filename=\"a \\\"b\\\" é.txt\"; filename*=UTF-8''a%20%22b%22%20%C3%A9.txt"
        );
    }
}
