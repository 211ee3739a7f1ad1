use axum::Json;

use super::data::LiveResponse;

pub async fn handler() -> Json<LiveResponse> {
    Json(LiveResponse {
        status: true,
        version: option_env!("CARGO_APP_VERSION").unwrap_or("dev").to_string(),
    })
}
