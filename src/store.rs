use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::analysis::schema::NutritionPayload;

/// One completed analysis. Immutable after creation except for `feedback`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    pub id: Uuid,
    pub image_url: String,
    pub nutrition: NutritionPayload,
    /// User rating 1..=4, set after the fact via the feedback endpoint.
    pub feedback: Option<i32>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// In-process record of completed analyses. Volatile by design: a restart
/// loses everything, and nothing is ever evicted.
#[derive(Clone, Default)]
pub struct AnalysisStore {
    inner: Arc<RwLock<HashMap<Uuid, MealAnalysis>>>,
}

impl AnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &self,
        image_url: &str,
        nutrition: NutritionPayload,
        feedback: Option<i32>,
    ) -> MealAnalysis {
        let analysis = MealAnalysis {
            id: Uuid::new_v4(),
            image_url: image_url.to_string(),
            nutrition,
            feedback,
            created_at: OffsetDateTime::now_utc(),
        };
        let mut map = self.inner.write().expect("analysis store lock poisoned");
        map.insert(analysis.id, analysis.clone());
        analysis
    }

    pub fn get(&self, id: Uuid) -> Option<MealAnalysis> {
        let map = self.inner.read().expect("analysis store lock poisoned");
        map.get(&id).cloned()
    }

    /// No-op when the id is unknown.
    pub fn set_feedback(&self, id: Uuid, rating: i32) {
        let mut map = self.inner.write().expect("analysis store lock poisoned");
        if let Some(analysis) = map.get_mut(&id) {
            analysis.feedback = Some(rating);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("analysis store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
