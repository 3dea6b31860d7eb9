use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::schema::NutritionPayload;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeMealRequest {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeMealResponse {
    pub analysis_id: Uuid,
    pub nutrition: NutritionPayload,
    pub image_url: String,
}

/// Feedback is keyed by image URL rather than analysis id; the client echoes
/// the nutrition payload it was shown.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<i32>,
    #[serde(default)]
    pub nutrition: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    pub feedback_id: Uuid,
}
