//! # Image Upload
//!
//! Stores slip and before/after photos in a shared cloud storage folder
//! and hands back a browser link.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upload_image { base64: "data:image/png;base64,iVBOR..." }              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parse_data_url ──► (image/png, bytes)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  access_token() ── cached? ──yes──────────────────────┐                 │
//! │       │ no                                             │                 │
//! │       ▼                                                │                 │
//! │  RS256 assertion ──► token_uri ──► access_token        │                 │
//! │                                                        ▼                 │
//! │  multipart/related upload (metadata + bytes) ──► webViewLink            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// OAuth scope limited to files this service creates.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

const UPLOAD_URL: &str =
    "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart&fields=webViewLink";

const DEFAULT_MIME: &str = "image/jpeg";

/// Refresh this many seconds before the token actually expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Prefix of the per-upload multipart boundary.
const BOUNDARY_PREFIX: &str = "clinic-pos-";

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    #[error("Invalid service account key: {0}")]
    Credentials(#[from] jsonwebtoken::errors::Error),

    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage provider rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
}

// =============================================================================
// Credentials
// =============================================================================

/// The fields of a service-account key file this uploader needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    web_view_link: String,
}

// =============================================================================
// Decoded Image
// =============================================================================

/// Raw bytes and MIME type of an uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// File extension for generated names.
    pub fn extension(&self) -> &str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "application/pdf" => "pdf",
            _ => "jpg",
        }
    }
}

/// Decodes a `data:<mime>;base64,<data>` URL or bare base64 text.
///
/// Bare base64 (and a data URL without a MIME type) is treated as JPEG.
pub fn parse_data_url(input: &str) -> Result<DecodedImage, UploadError> {
    let input = input.trim();

    let (mime, data) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| UploadError::InvalidImage("data URL has no comma".to_string()))?;
            let mime = header.strip_suffix(";base64").ok_or_else(|| {
                UploadError::InvalidImage("only base64 data URLs are supported".to_string())
            })?;
            let mime = if mime.is_empty() { DEFAULT_MIME } else { mime };
            (mime.to_string(), data)
        }
        None => (DEFAULT_MIME.to_string(), input),
    };

    if data.is_empty() {
        return Err(UploadError::InvalidImage("no image data".to_string()));
    }

    let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| UploadError::InvalidImage(e.to_string()))?;

    Ok(DecodedImage { mime, bytes })
}

/// Fresh boundary per upload, so image bytes cannot collide with it.
fn new_boundary() -> String {
    format!("{}{}", BOUNDARY_PREFIX, Uuid::new_v4().simple())
}

/// Builds a `multipart/related` body: JSON metadata part, then the media.
fn multipart_body(boundary: &str, metadata: &serde_json::Value, image: &DecodedImage) -> Vec<u8> {
    let mut body = Vec::with_capacity(image.bytes.len() + 512);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", image.mime).as_bytes());
    body.extend_from_slice(&image.bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

// =============================================================================
// Uploader
// =============================================================================

/// Service-account uploader into one folder.
#[derive(Debug)]
pub struct DriveUploader {
    client: reqwest::Client,
    key: ServiceAccountKey,
    folder_id: String,
    token: Mutex<Option<CachedToken>>,
}

impl DriveUploader {
    pub fn new(client: reqwest::Client, key: ServiceAccountKey, folder_id: String) -> Self {
        DriveUploader {
            client,
            key,
            folder_id,
            token: Mutex::new(None),
        }
    }

    /// Signs the JWT bearer assertion exchanged for an access token.
    fn assertion(&self, now: i64) -> Result<String, UploadError> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }

    /// Returns a valid access token, fetching a new one when needed.
    async fn access_token(&self) -> Result<String, UploadError> {
        let mut cached = self.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref() {
            if token.expires_at - TOKEN_EXPIRY_MARGIN_SECS > now {
                return Ok(token.value.clone());
            }
        }

        debug!(client = %self.key.client_email, "Requesting storage access token");
        let assertion = self.assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let token: TokenResponse = response.json().await?;
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: now + token.expires_in,
        });

        Ok(token.access_token)
    }

    /// Uploads an image and returns its web view link.
    pub async fn upload(&self, image: &DecodedImage, file_name: Option<&str>) -> Result<String, UploadError> {
        let name = match file_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{}.{}", Uuid::new_v4(), image.extension()),
        };
        let metadata = json!({ "name": name, "parents": [self.folder_id] });

        let token = self.access_token().await?;
        let boundary = new_boundary();
        let response = self
            .client
            .post(UPLOAD_URL)
            .bearer_auth(token)
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", boundary),
            )
            .body(multipart_body(&boundary, &metadata, image))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(UploadError::Rejected {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let uploaded: UploadResponse = response.json().await?;
        info!(name = %name, size = image.bytes.len(), "Image uploaded");
        Ok(uploaded.web_view_link)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_url_with_mime() {
        let image = parse_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime, "image/png");
        assert_eq!(image.bytes, b"hello");
        assert_eq!(image.extension(), "png");
    }

    #[test]
    fn test_parse_bare_base64_defaults_to_jpeg() {
        let image = parse_data_url("aGVs\nbG8=").unwrap();
        assert_eq!(image.mime, "image/jpeg");
        assert_eq!(image.bytes, b"hello");
        assert_eq!(image.extension(), "jpg");

        let image = parse_data_url("data:;base64,aGVsbG8=").unwrap();
        assert_eq!(image.mime, "image/jpeg");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(parse_data_url(""), Err(UploadError::InvalidImage(_))));
        assert!(matches!(
            parse_data_url("data:image/png;base64,"),
            Err(UploadError::InvalidImage(_))
        ));
        assert!(matches!(
            parse_data_url("data:text/plain,hello"),
            Err(UploadError::InvalidImage(_))
        ));
        assert!(matches!(
            parse_data_url("not base64!!"),
            Err(UploadError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_multipart_body_layout() {
        let image = DecodedImage {
            mime: "image/png".into(),
            bytes: b"PNGDATA".to_vec(),
        };
        let body = multipart_body("b123", &json!({ "name": "slip.png", "parents": ["f1"] }), &image);
        let text = String::from_utf8(body).unwrap();

        assert!(text.starts_with("--b123\r\nContent-Type: application/json"));
        assert!(text.contains(r#""parents":["f1"]"#));
        assert!(text.contains("\r\n--b123\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n"));
        assert!(text.ends_with("\r\n--b123--\r\n"));
    }

    #[test]
    fn test_each_upload_gets_its_own_boundary() {
        let first = new_boundary();
        let second = new_boundary();

        assert_ne!(first, second);
        assert!(first.starts_with(BOUNDARY_PREFIX));
        // Image bytes containing an earlier boundary must not end the part.
        let image = DecodedImage {
            mime: "image/png".into(),
            bytes: format!("--{}--", first).into_bytes(),
        };
        let text = String::from_utf8(multipart_body(&second, &json!({}), &image)).unwrap();
        assert_eq!(text.matches(&format!("--{}", second)).count(), 3);
    }

    #[test]
    fn test_service_account_key_defaults() {
        let key: ServiceAccountKey = serde_json::from_str(
            r#"{"type":"service_account","client_email":"a@b.c","private_key":"pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
    }

    #[test]
    fn test_invalid_private_key_is_credentials_error() {
        let uploader = DriveUploader::new(
            reqwest::Client::new(),
            ServiceAccountKey {
                client_email: "a@b.c".into(),
                private_key: "not a pem".into(),
                token_uri: default_token_uri(),
            },
            "folder".into(),
        );
        assert!(matches!(uploader.assertion(0), Err(UploadError::Credentials(_))));
    }
}
