//! Property feature handlers

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::response::ApiResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use ruu_core::{Feature, NewFeature};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateFeatureRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Swimming pool")]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Create a feature
#[utoipa::path(
    post,
    path = "/api/v1/features",
    tag = "features",
    request_body = CreateFeatureRequest,
    responses(
        (status = 201, description = "Feature created", body = crate::response::FeatureEnvelope),
        (status = 400, description = "Invalid request body", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_feature(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateFeatureRequest>,
) -> Result<(StatusCode, ApiResponse<Feature>), AppError> {
    let feature = state
        .features
        .create(NewFeature {
            name: request.name,
            description: request.description.unwrap_or_default(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Feature created successfully", feature),
    ))
}
