//! Property listing handlers

use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::response::{ApiResponse, PaginatedResponse};
use crate::state::AppState;
use axum::extract::{Query, State};
use ruu_core::{ListQuery, NewProperty, Property};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreatePropertyRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "Villa Kemang")]
    pub name: String,

    #[validate(length(min = 1, message = "Description is required"))]
    #[schema(example = "Three-bedroom villa with private pool")]
    pub description: String,
}

/// Create a property
#[utoipa::path(
    post,
    path = "/api/v1/properties",
    tag = "properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 200, description = "Property created", body = crate::response::PropertyEnvelope),
        (status = 400, description = "Invalid request body", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_property(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreatePropertyRequest>,
) -> Result<ApiResponse<Property>, AppError> {
    let property = state
        .properties
        .create(NewProperty {
            name: request.name,
            description: request.description,
        })
        .await?;

    Ok(ApiResponse::ok("Successfully created property", property))
}

/// List properties
#[utoipa::path(
    get,
    path = "/api/v1/properties",
    tag = "properties",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of properties", body = crate::response::PropertyPage),
        (status = 400, description = "Invalid list parameters", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_properties(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<PaginatedResponse<Property>, AppError> {
    query.validate::<Property>()?;
    let page = state.properties.list(&query.resolve::<Property>()).await?;
    Ok(PaginatedResponse::new("Successfully fetched properties", page))
}
