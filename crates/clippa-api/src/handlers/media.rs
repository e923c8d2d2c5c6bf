//! Remote media lookups.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use clippa_models::{FormatOption, VideoSummary};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

impl UrlQuery {
    fn require(self) -> ApiResult<String> {
        self.url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("url is required"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FormatsResponse {
    pub formats: Vec<FormatOption>,
}

pub async fn get_formats(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<FormatsResponse>> {
    let url = query.require()?;
    let formats = state.metadata.formats(&url).await?;
    Ok(Json(FormatsResponse { formats }))
}

pub async fn get_info(
    State(state): State<AppState>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<Json<VideoSummary>> {
    let url = query.require()?;
    Ok(Json(state.metadata.info(&url).await?))
}
