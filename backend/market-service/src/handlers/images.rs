/// Image handlers - multipart upload to object storage and read-through fetch
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::StreamExt;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::UserId;
use crate::storage::{ensure_supported_image, ImageStore};

/// Upper bound for one uploaded image.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
}

/// Image names become object keys, so only a conservative alphabet is allowed.
pub(crate) fn validate_image_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 128
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("invalid image name '{}'", name)))
    }
}

/// Upload the `file` field of a multipart form as `{image_name}`
pub async fn upload_image(
    images: web::Data<Arc<dyn ImageStore>>,
    _user_id: UserId,
    image_name: web::Path<String>,
    mut payload: Multipart,
) -> Result<HttpResponse> {
    validate_image_name(&image_name)?;

    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Some(field) = payload.next().await {
        let mut field =
            field.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .cloned()
            .ok_or_else(|| AppError::BadRequest("file field has no content type".into()))?;
        ensure_supported_image(&content_type).map_err(|e| AppError::BadRequest(e.to_string()))?;

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("File read error: {}", e)))?;
            if data.len() + chunk.len() > MAX_IMAGE_BYTES {
                return Err(AppError::BadRequest("image exceeds 10MB".into()));
            }
            data.extend_from_slice(&chunk);
        }

        upload = Some((data, content_type.to_string()));
    }

    let (data, content_type) =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".into()))?;
    if data.is_empty() {
        return Err(AppError::BadRequest("Empty file".into()));
    }

    images.put(&image_name, data, &content_type).await?;
    tracing::info!(image = %image_name, %content_type, "Image uploaded");

    Ok(HttpResponse::Ok().json(UploadResponse { message: "success" }))
}

/// Stream back a stored image
pub async fn get_image(
    images: web::Data<Arc<dyn ImageStore>>,
    image_name: web::Path<String>,
) -> Result<HttpResponse> {
    validate_image_name(&image_name)?;

    let body = images.get(&image_name).await?;
    Ok(HttpResponse::Ok().content_type("image/jpeg").body(body))
}
