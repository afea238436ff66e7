use crate::{services::type_catalog::TypeCatalog, AppState};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

#[utoipa::path(
    get,
    path = "/api/question-types",
    responses(
        (status = 200, description = "Built-in question types", body = Json<serde_json::Value>),
    ),
)]
pub async fn list_question_types(State(state): State<AppState>) -> impl IntoResponse {
    let catalog: &TypeCatalog = &state.type_catalog;
    (StatusCode::OK, Json(catalog.records().to_vec()))
}
