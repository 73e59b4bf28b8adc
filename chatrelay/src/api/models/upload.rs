use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body returned by `POST /api/upload`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Name of the file as sent by the client
    pub file_name: String,
    /// The provider's analysis of the file content
    pub response: String,
}
