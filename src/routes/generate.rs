use crate::{
    dto::generation_dto::GenerateQuestionsPayload,
    error::{Error, Result},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

#[utoipa::path(
    post,
    path = "/api/generate-questions",
    request_body = GenerateQuestionsPayload,
    responses(
        (status = 200, description = "Exercise generated", body = Json<serde_json::Value>),
        (status = 400, description = "Invalid request payload"),
        (status = 500, description = "Generation failed after retries"),
    ),
)]
pub async fn generate_questions(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateQuestionsPayload>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.map_err(|rejection| Error::BadRequest(rejection.body_text()))?;
    let request = payload.into_request()?;

    let exercise = state.generation_service.generate_exercise(&request).await?;
    tracing::info!(
        "Generated exercise {} with {} question(s)",
        exercise.id,
        exercise.questions.len()
    );

    Ok((StatusCode::OK, Json(exercise)))
}
