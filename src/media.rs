use std::collections::HashMap;

use async_trait::async_trait;
use axum::{body::Bytes, extract::Multipart};
use serde::Deserialize;

use crate::{config::settings::Settings, error::AppError};

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upload service rejected the file: {0}")]
    Rejected(String),
}

/// A file received from a client, ready to be forwarded.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Object storage for user media. Returns a stable public URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, folder: &str, upload: Upload) -> Result<String, MediaError>;
}

/// Unsigned uploads through a Cloudinary upload preset.
pub struct CloudinaryUploader {
    client: reqwest::Client,
    endpoint: String,
    upload_preset: String,
}

#[derive(Debug, Deserialize)]
struct CloudinaryResponse {
    secure_url: Option<String>,
    error: Option<CloudinaryError>,
}

#[derive(Debug, Deserialize)]
struct CloudinaryError {
    message: String,
}

impl CloudinaryUploader {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/{}/image/upload",
                settings.cloudinary_base_url.trim_end_matches('/'),
                settings.cloudinary_cloud_name
            ),
            upload_preset: settings.cloudinary_upload_preset.clone(),
        }
    }
}

#[async_trait]
impl MediaUploader for CloudinaryUploader {
    async fn upload(&self, folder: &str, upload: Upload) -> Result<String, MediaError> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes.to_vec())
            .file_name(upload.file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string())
            .part("file", part);

        let body: CloudinaryResponse = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;

        match (body.secure_url, body.error) {
            (Some(url), _) => Ok(url),
            (None, Some(err)) => Err(MediaError::Rejected(err.message)),
            (None, None) => Err(MediaError::Rejected("no url returned".to_string())),
        }
    }
}

/// Multipart body split into its single file part and its text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<Upload>,
    pub fields: HashMap<String, String>,
}

/// Reads a multipart body, keeping the part named `file_field` as the upload.
pub async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::ValidationFailure(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::ValidationFailure(e.body_text()))?;
            if !bytes.is_empty() {
                form.file = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::ValidationFailure(e.body_text()))?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

impl UploadForm {
    pub fn require_file(&mut self) -> Result<Upload, AppError> {
        self.file
            .take()
            .ok_or(AppError::ValidationFailure("Image is required".to_string()))
    }
}
