use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{AnalyzeMealRequest, AnalyzeMealResponse, FeedbackRequest, FeedbackResponse};
use super::error::AnalysisError;
use super::gateway;
use super::schema::validate;
use crate::state::AppState;
use crate::store::MealAnalysis;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/analyze-meal", post(analyze_meal))
        .route("/api/feedback", post(submit_feedback))
        .route("/api/analyses/:id", get(get_analysis))
}

#[instrument(skip(state, body))]
pub async fn analyze_meal(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeMealRequest>,
) -> Result<Json<AnalyzeMealResponse>, AnalysisError> {
    let image_url = body
        .image_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AnalysisError::Input("Image URL is required".into()))?;

    let nutrition = gateway::analyze(&state, &image_url).await?;

    let analysis = state.store.create(&image_url, nutrition.clone(), None);
    info!(analysis_id = %analysis.id, %image_url, "analysis stored");

    Ok(Json(AnalyzeMealResponse {
        analysis_id: analysis.id,
        nutrition,
        image_url,
    }))
}

#[instrument(skip(state, body))]
pub async fn submit_feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AnalysisError> {
    let (Some(image_url), Some(rating), Some(nutrition)) =
        (body.image_url, body.rating, body.nutrition)
    else {
        return Err(AnalysisError::Input("Missing required fields".into()));
    };

    if !(1..=4).contains(&rating) {
        warn!(rating, "feedback rating out of range");
        return Err(AnalysisError::Input(
            "Rating must be between 1 and 4".into(),
        ));
    }

    // The client echoes back the payload it was shown; a malformed echo is a
    // client error, not a downstream failure.
    let nutrition = validate(&nutrition)
        .map_err(|e| AnalysisError::Input(format!("Invalid nutrition payload: {}", e)))?;

    let analysis = state.store.create(&image_url, nutrition, Some(rating));
    info!(feedback_id = %analysis.id, rating, "feedback recorded");

    Ok(Json(FeedbackResponse {
        success: true,
        feedback_id: analysis.id,
    }))
}

#[instrument(skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MealAnalysis>, (StatusCode, String)> {
    state
        .store
        .get(id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Analysis not found".into()))
}

#[cfg(test)]
mod handler_tests {
    use super::*;
    use axum::response::IntoResponse;
    use bytes::Bytes;
    use serde_json::{json, Value};

    async fn stub_webhook(status: StatusCode, body: Value) -> String {
        let app = Router::new().route(
            "/webhook",
            post(move || {
                let body = body.clone();
                async move { (status, Json(body)) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}/webhook", addr)
    }

    fn webhook_nutrition() -> Value {
        json!({
            "status": "success",
            "food": [{"name": "Rice", "quantity": "1 cup", "calories": 200, "protein": 4, "carbs": 45, "fat": 0}],
            "total": {"calories": 200, "protein": 4, "carbs": 45, "fat": 0}
        })
    }

    async fn stored_image_url(state: &AppState) -> String {
        state
            .storage
            .put_object("meal.jpg", Bytes::from_static(b"jpegbytes"), "image/jpeg")
            .await
            .unwrap();
        state.storage.public_url("meal.jpg").await.unwrap()
    }

    #[tokio::test]
    async fn test_analyze_meal_end_to_end() {
        let webhook = stub_webhook(StatusCode::OK, webhook_nutrition()).await;
        let state = AppState::fake_with_webhook(&webhook);
        let image_url = stored_image_url(&state).await;

        let Json(resp) = analyze_meal(
            State(state.clone()),
            Json(AnalyzeMealRequest {
                image_url: Some(image_url.clone()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(resp.nutrition.total.calories, 200.0);
        assert_eq!(resp.image_url, image_url);

        let stored = state.store.get(resp.analysis_id).unwrap();
        assert_eq!(stored.nutrition, resp.nutrition);
        assert!(stored.feedback.is_none());
    }

    #[tokio::test]
    async fn test_analyze_meal_without_image_url_is_400() {
        let state = AppState::fake();

        let err = analyze_meal(
            State(state.clone()),
            Json(AnalyzeMealRequest { image_url: None }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_meal_webhook_failure_stores_nothing() {
        let webhook = stub_webhook(StatusCode::BAD_GATEWAY, json!({"error": "boom"})).await;
        let state = AppState::fake_with_webhook(&webhook);
        let image_url = stored_image_url(&state).await;

        let err = analyze_meal(
            State(state.clone()),
            Json(AnalyzeMealRequest {
                image_url: Some(image_url),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_meal_invalid_payload_stores_nothing() {
        let mut body = webhook_nutrition();
        body.as_object_mut().unwrap().remove("total");
        let webhook = stub_webhook(StatusCode::OK, body).await;
        let state = AppState::fake_with_webhook(&webhook);
        let image_url = stored_image_url(&state).await;

        analyze_meal(
            State(state.clone()),
            Json(AnalyzeMealRequest {
                image_url: Some(image_url),
            }),
        )
        .await
        .unwrap_err();

        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_round_trip() {
        let state = AppState::fake();

        let Json(resp) = submit_feedback(
            State(state.clone()),
            Json(FeedbackRequest {
                image_url: Some("http://localhost:8080/uploads/meal.jpg".into()),
                rating: Some(3),
                nutrition: Some(webhook_nutrition()),
            }),
        )
        .await
        .unwrap();

        assert!(resp.success);
        let stored = state.store.get(resp.feedback_id).unwrap();
        assert_eq!(stored.feedback, Some(3));
    }

    #[tokio::test]
    async fn test_feedback_rating_out_of_range_is_400() {
        let state = AppState::fake();

        for rating in [0, 5, -1] {
            let err = submit_feedback(
                State(state.clone()),
                Json(FeedbackRequest {
                    image_url: Some("http://localhost:8080/uploads/meal.jpg".into()),
                    rating: Some(rating),
                    nutrition: Some(webhook_nutrition()),
                }),
            )
            .await
            .unwrap_err();
            assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        }
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_feedback_missing_fields_is_400() {
        let state = AppState::fake();

        let err = submit_feedback(
            State(state.clone()),
            Json(FeedbackRequest {
                image_url: None,
                rating: Some(2),
                nutrition: Some(webhook_nutrition()),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn test_get_analysis_found_and_missing() {
        let state = AppState::fake();
        let created = state.store.create(
            "http://localhost:8080/uploads/meal.jpg",
            crate::analysis::schema::validate(&webhook_nutrition()).unwrap(),
            None,
        );

        let Json(found) = get_analysis(State(state.clone()), Path(created.id))
            .await
            .unwrap();
        assert_eq!(found.id, created.id);

        let err = get_analysis(State(state), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }
}
