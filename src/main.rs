use axum::{
    routing::{get, post},
    Router,
};
use exercise_generator::{
    config::{get_config, init_config},
    routes, telemetry, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();
    init_config()?;
    let config = get_config();

    let app_state = AppState::new(config)?;

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/generate-questions",
            post(routes::generate::generate_questions),
        )
        .route(
            "/api/question-types",
            get(routes::question_types::list_question_types),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
