use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct UploadTargetResponse {
    #[serde(rename = "uploadURL")]
    pub upload_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImageResponse {
    pub success: bool,
    pub image_url: String,
    pub filename: String,
}
