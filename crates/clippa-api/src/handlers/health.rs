//! Liveness handlers.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct PingResponse {
    pub success: bool,
}

pub async fn alive() -> &'static str {
    "Server is alive!"
}

pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse { success: true })
}
