use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Video
///
/// One uploaded video's metadata, stored in the `videos` table. Serialized with
/// camelCase field names, which is what the frontend consumes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    // Stored object identifier returned by the media host.
    pub public_id: String,
    // Size as reported by the client before upload (kept verbatim).
    pub original_size: String,
    // Size of the stored asset as reported by the media host.
    pub compressed_size: String,
    // Seconds; 0 when the media host reports no duration.
    pub duration: f64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// NewVideo
///
/// Fields supplied when inserting a record. Ids and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub public_id: String,
    pub original_size: String,
    pub compressed_size: String,
    pub duration: f64,
}

// --- Response Payloads (Output Schemas) ---

/// ImageUploadResponse
///
/// Output of `POST /api/upload/image`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ImageUploadResponse {
    /// The media host's identifier for the stored image.
    pub public_id: String,
}

/// VideoUploadResponse
///
/// Output of `POST /api/upload/video`: the record that was created.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct VideoUploadResponse {
    pub video: Video,
}

/// ErrorResponse
///
/// Body of every non-2xx JSON response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

// --- Multipart Form Schemas (Documentation only) ---

/// ImageUploadForm
///
/// `multipart/form-data` body accepted by `POST /api/upload/image`.
#[derive(ToSchema)]
pub struct ImageUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// VideoUploadForm
///
/// `multipart/form-data` body accepted by `POST /api/upload/video`.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct VideoUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub title: String,
    pub description: Option<String>,
    /// Size of the file before upload, as measured by the client.
    pub original_size: String,
}
