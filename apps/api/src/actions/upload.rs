//! # Upload Action

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

use super::decode;
use crate::error::{ApiError, ApiResult, ErrorCode};
use crate::upload::{parse_data_url, UploadError};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadPayload {
    #[serde(default)]
    base64: String,
    #[serde(default)]
    file_name: Option<String>,
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::InvalidImage(reason) => {
                ApiError::validation(format!("Invalid image data: {}", reason))
            }
            UploadError::Credentials(e) => {
                error!("Service account key rejected: {}", e);
                ApiError::new(ErrorCode::Configuration, "Invalid GDrive Config")
            }
            other => {
                error!("Image upload failed: {}", other);
                ApiError::new(ErrorCode::Upstream, "Image upload failed")
            }
        }
    }
}

pub async fn upload_image(state: &AppState, payload: Value) -> ApiResult<Value> {
    let Some(uploader) = state.uploader.as_ref() else {
        return Err(ApiError::new(ErrorCode::Configuration, "Missing GDrive Config"));
    };

    let payload: UploadPayload = decode(payload)?;
    let image = parse_data_url(&payload.base64)?;
    let link = uploader.upload(&image, payload.file_name.as_deref()).await?;

    Ok(json!({ "link": link }))
}
