//! Upload result shapes handed to the response encoder

use crate::pipeline::Upload;
use crate::Error;
use serde::{Deserialize, Serialize};

/// One stored file as reported to the uploader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub url: String,
    /// Name the client sent
    pub name: String,
    /// Content hash, hex
    pub hash: String,
    pub size: u64,
}

impl UploadResult {
    pub fn new(base_url: &str, original_name: &str, upload: &Upload) -> Self {
        UploadResult {
            url: format!("{}/{}", base_url.trim_end_matches('/'), upload.id),
            name: original_name.to_string(),
            hash: upload.hash.to_hex(),
            size: upload.size,
        }
    }
}

/// Outcome of an upload request; on failure no files are reported
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(rename = "errorcode", default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<UploadResult>,
}

impl UploadResponse {
    pub fn success(files: Vec<UploadResult>) -> Self {
        UploadResponse {
            success: true,
            error_code: None,
            description: None,
            files,
        }
    }

    pub fn failure(error: &Error) -> Self {
        UploadResponse {
            success: false,
            error_code: Some(error.status_code()),
            description: Some(error.to_string()),
            files: Vec::new(),
        }
    }

    /// HTTP status to send with this response
    pub fn status_code(&self) -> u16 {
        self.error_code.unwrap_or(200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentHash;

    fn upload() -> Upload {
        Upload {
            id: "qwerty.txt".to_string(),
            hash: ContentHash::digest(b"hello world"),
            size: 11,
            mime: "text/plain".to_string(),
            deduplicated: false,
        }
    }

    #[test]
    fn test_result_url() {
        let a = UploadResult::new("https://files.example/", "hello.txt", &upload());
        let b = UploadResult::new("https://files.example", "hello.txt", &upload());
        assert_eq!(a.url, "https://files.example/qwerty.txt");
        assert_eq!(a, b);
        assert_eq!(a.hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
    }

    #[test]
    fn test_success_json() {
        let response = UploadResponse::success(vec![UploadResult::new(
            "https://files.example/",
            "hello.txt",
            &upload(),
        )]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert!(json.get("errorcode").is_none());
        assert_eq!(json["files"][0]["name"], "hello.txt");
        assert_eq!(json["files"][0]["size"], 11);
        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn test_failure_json() {
        let response = UploadResponse::failure(&Error::TooLarge(100));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["errorcode"], 413);
        assert_eq!(
            json["description"],
            "file exceeds maximum allowed size of 100 bytes"
        );
        assert!(json.get("files").is_none());
        assert_eq!(response.status_code(), 413);
    }
}
