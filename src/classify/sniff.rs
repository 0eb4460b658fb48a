//! Signature-table classifier
//!
//! Looks at the leading bytes of a file and matches them against known magic
//! numbers. Content without a signature is text if it is NUL-free UTF-8 and
//! opaque binary otherwise.

use super::{Classifier, OCTET_STREAM};
use crate::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Bytes inspected per file
const SNIFF_LEN: usize = 8192;

pub const EMPTY: &str = "inode/x-empty";
pub const TEXT_PLAIN: &str = "text/plain";

/// (offset, magic, MIME type)
const SIGNATURES: &[(usize, &[u8], &str)] = &[
    (0, b"\x89PNG\r\n\x1a\n", "image/png"),
    (0, b"\xff\xd8\xff", "image/jpeg"),
    (0, b"GIF87a", "image/gif"),
    (0, b"GIF89a", "image/gif"),
    (0, b"II*\x00", "image/tiff"),
    (0, b"MM\x00*", "image/tiff"),
    (0, b"\x00\x00\x01\x00", "image/vnd.microsoft.icon"),
    (0, b"%PDF-", "application/pdf"),
    (0, b"%!PS", "application/postscript"),
    (0, b"PK\x03\x04", "application/zip"),
    (0, b"\x1f\x8b", "application/gzip"),
    (0, b"BZh", "application/x-bzip2"),
    (0, b"\xfd7zXZ\x00", "application/x-xz"),
    (0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (0, b"Rar!\x1a\x07", "application/x-rar"),
    (0, b"\x7fELF", "application/x-executable"),
    (0, b"MZ", "application/x-dosexec"),
    (0, b"\x00asm", "application/wasm"),
    (0, b"SQLite format 3\x00", "application/vnd.sqlite3"),
    (0, b"OggS", "audio/ogg"),
    (0, b"fLaC", "audio/flac"),
    (0, b"ID3", "audio/mpeg"),
    (4, b"ftyp", "video/mp4"),
    (257, b"ustar", "application/x-tar"),
];

/// Classifier backed by a built-in table of file signatures
#[derive(Clone, Copy, Debug, Default)]
pub struct SniffClassifier;

impl SniffClassifier {
    pub fn new() -> Self {
        SniffClassifier
    }

    /// Classify an in-memory prefix of a file
    pub fn sniff(head: &[u8]) -> &'static str {
        if head.is_empty() {
            return EMPTY;
        }

        for &(offset, magic, mime) in SIGNATURES {
            if head.get(offset..offset + magic.len()) == Some(magic) {
                return mime;
            }
        }

        if head.len() >= 12 && &head[..4] == b"RIFF" {
            match &head[8..12] {
                b"WEBP" => return "image/webp",
                b"WAVE" => return "audio/x-wav",
                b"AVI " => return "video/x-msvideo",
                _ => {}
            }
        }

        if head.starts_with(b"\x1a\x45\xdf\xa3") {
            let window = &head[..head.len().min(64)];
            if window.windows(4).any(|w| w == b"webm") {
                return "video/webm";
            }
            return "video/x-matroska";
        }

        if is_text(head) {
            return sniff_text(head);
        }

        OCTET_STREAM
    }
}

impl Classifier for SniffClassifier {
    fn classify(&self, path: &Path) -> Result<String> {
        let file = File::open(path)?;
        let mut head = Vec::with_capacity(SNIFF_LEN);
        file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
        Ok(Self::sniff(&head).to_string())
    }

    fn name(&self) -> &str {
        "sniff"
    }
}

/// NUL-free UTF-8, tolerating a character cut off at the end of the window
fn is_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

fn sniff_text(head: &[u8]) -> &'static str {
    let text = String::from_utf8_lossy(&head[..head.len().min(512)]);
    let start = text
        .trim_start_matches('\u{feff}')
        .trim_start()
        .to_ascii_lowercase();

    if start.starts_with("<!doctype html") || start.starts_with("<html") {
        "text/html"
    } else if start.starts_with("<svg") || (start.starts_with("<?xml") && start.contains("<svg"))
    {
        "image/svg+xml"
    } else if start.starts_with("<?xml") {
        "text/xml"
    } else if start.starts_with("#!") {
        "text/x-shellscript"
    } else {
        TEXT_PLAIN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(SniffClassifier::sniff(b"\x89PNG\r\n\x1a\n\0\0"), "image/png");
        assert_eq!(SniffClassifier::sniff(b"\xff\xd8\xff\xe0rest"), "image/jpeg");
        assert_eq!(SniffClassifier::sniff(b"GIF89a..."), "image/gif");
        assert_eq!(SniffClassifier::sniff(b"%PDF-1.7\n"), "application/pdf");
        assert_eq!(
            SniffClassifier::sniff(b"MZ\x90\x00\x03\x00"),
            "application/x-dosexec"
        );
        assert_eq!(
            SniffClassifier::sniff(b"RIFF\x24\x00\x00\x00WEBPVP8 "),
            "image/webp"
        );
        assert_eq!(
            SniffClassifier::sniff(b"\x00\x00\x00\x18ftypmp42"),
            "video/mp4"
        );
    }

    #[test]
    fn test_sniff_tar_offset() {
        let mut head = vec![0u8; 512];
        head[..8].copy_from_slice(b"file.txt");
        head[257..262].copy_from_slice(b"ustar");
        assert_eq!(SniffClassifier::sniff(&head), "application/x-tar");
    }

    #[test]
    fn test_sniff_text() {
        assert_eq!(SniffClassifier::sniff(b"just some words\n"), TEXT_PLAIN);
        assert_eq!(SniffClassifier::sniff("naïve café".as_bytes()), TEXT_PLAIN);
        assert_eq!(
            SniffClassifier::sniff(b"  <!DOCTYPE html><html></html>"),
            "text/html"
        );
        assert_eq!(
            SniffClassifier::sniff(b"<?xml version=\"1.0\"?><svg></svg>"),
            "image/svg+xml"
        );
        assert_eq!(SniffClassifier::sniff(b"<?xml version=\"1.0\"?><a/>"), "text/xml");
        assert_eq!(SniffClassifier::sniff(b"#!/bin/sh\necho"), "text/x-shellscript");
    }

    #[test]
    fn test_sniff_truncated_utf8_is_text() {
        let mut head = b"abc".to_vec();
        head.extend_from_slice(&"é".as_bytes()[..1]);
        assert_eq!(SniffClassifier::sniff(&head), TEXT_PLAIN);
    }

    #[test]
    fn test_sniff_binary_and_empty() {
        assert_eq!(SniffClassifier::sniff(b"\x01\x02\x00\x03"), OCTET_STREAM);
        assert_eq!(SniffClassifier::sniff(b"\xc3\x28 invalid"), OCTET_STREAM);
        assert_eq!(SniffClassifier::sniff(b""), EMPTY);
    }

    #[test]
    fn test_classify_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload");
        std::fs::write(&path, b"GIF87a\x01\x00").unwrap();
        let classifier = SniffClassifier::new();
        assert_eq!(classifier.classify(&path).unwrap(), "image/gif");
        assert!(classifier.classify(&dir.path().join("missing")).is_err());
    }
}
