use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    media::{ResourceType, Transformation, UploadOptions},
    models::{
        ErrorResponse, ImageUploadForm, ImageUploadResponse, NewVideo, Video, VideoUploadForm,
        VideoUploadResponse,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
};
use std::collections::HashMap;

/// Media host folder for uploaded images.
pub const IMAGE_FOLDER: &str = "MediaFlex-images";
/// Media host folder for uploaded videos.
pub const VIDEO_FOLDER: &str = "MediaFlex-videos";

/// UploadForm
///
/// A fully read multipart body: the `file` part plus every text field by name.
#[derive(Debug, Default)]
struct UploadForm {
    file: Option<Bytes>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                form.file = Some(field.bytes().await?);
            } else if !name.is_empty() {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// The uploaded bytes. An absent or empty part is reported as missing.
    fn take_file(&mut self) -> Result<Bytes, AppError> {
        self.file
            .take()
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| AppError::Validation("file not found".to_string()))
    }

    fn require(&mut self, name: &str) -> Result<String, AppError> {
        self.optional(name)
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.fields
            .remove(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }
}

// --- Handlers ---

/// upload_image
///
/// [Authenticated Route] Forwards an image to the media host and returns its identifier.
///
/// Checks run in order: identity (401), media host credentials (500), form (400).
#[utoipa::path(
    post,
    path = "/api/upload/image",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored", body = ImageUploadResponse),
        (status = 400, description = "Missing file", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 413, description = "Body exceeds the upload limit", body = ErrorResponse),
        (status = 500, description = "Media host failure", body = ErrorResponse)
    )
)]
pub async fn upload_image(
    AuthUser { id: user_id }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    let media = state.media.as_ref().ok_or(AppError::MediaHostNotConfigured)?;

    let mut form = UploadForm::read(&mut multipart).await?;
    let file = form.take_file()?;

    let asset = media
        .upload_stream(file, UploadOptions::new(IMAGE_FOLDER))
        .await?;

    tracing::info!(user_id = %user_id, public_id = %asset.stored_id, "image uploaded");

    Ok(Json(ImageUploadResponse {
        public_id: asset.stored_id,
    }))
}

/// upload_video
///
/// [Authenticated Route] Forwards a video to the media host (mp4, automatic quality)
/// and records its metadata.
///
/// The public id hint combines the uploader, the title and the upload time so repeated
/// uploads of the same title never collide.
#[utoipa::path(
    post,
    path = "/api/upload/video",
    request_body(content = VideoUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Stored and recorded", body = VideoUploadResponse),
        (status = 400, description = "Missing field", body = ErrorResponse),
        (status = 401, description = "No session", body = ErrorResponse),
        (status = 413, description = "Body exceeds the upload limit", body = ErrorResponse),
        (status = 500, description = "Media host or record store failure", body = ErrorResponse)
    )
)]
pub async fn upload_video(
    AuthUser { id: user_id }: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<VideoUploadResponse>, AppError> {
    let media = state.media.as_ref().ok_or(AppError::MediaHostNotConfigured)?;

    let mut form = UploadForm::read(&mut multipart).await?;
    let file = form.take_file()?;
    let title = form.require("title")?;
    let original_size = form.require("originalSize")?;
    let description = form.optional("description");

    let options = UploadOptions::new(VIDEO_FOLDER)
        .resource_type(ResourceType::Video)
        .public_id(format!(
            "{}-{}-{}",
            user_id,
            title,
            chrono::Utc::now().timestamp_millis()
        ))
        .transformation(Transformation::new().quality("auto").fetch_format("mp4"));

    let asset = media.upload_stream(file, options).await?;

    let video = state
        .repo
        .create_video(NewVideo {
            title,
            description,
            public_id: asset.stored_id,
            original_size,
            compressed_size: asset.byte_size.to_string(),
            duration: asset.duration_seconds.unwrap_or(0.0),
        })
        .await?;

    tracing::info!(user_id = %user_id, video_id = %video.id, "video uploaded");

    Ok(Json(VideoUploadResponse { video }))
}

/// get_videos
///
/// [Public API Route] Lists every recorded video, newest first.
#[utoipa::path(
    get,
    path = "/api/videos",
    responses(
        (status = 200, description = "Videos, newest first", body = [Video]),
        (status = 500, description = "Record store failure", body = ErrorResponse)
    )
)]
pub async fn get_videos(State(state): State<AppState>) -> Result<Json<Vec<Video>>, AppError> {
    let videos = state.repo.list_videos().await?;
    Ok(Json(videos))
}

/// not_found
///
/// Fallback for paths the access middleware let through but no route serves.
pub async fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Not Found".to_string(),
        }),
    )
}
