//! Client record handlers
//!
//! Author: alfredo.tarigan@gmail.com

use crate::error::AppError;
use crate::extract::{parse_id, ValidatedJson};
use crate::response::{ApiResponse, PaginatedResponse};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use ruu_core::{Client, ClientChanges, ListQuery, NewClient};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::{Validate, ValidateEmail, ValidationError};

const INVALID_CLIENT_ID: &str = "Invalid client ID";

/// New client record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateClientRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    #[schema(example = "PT Sinar Jaya")]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "info@sinarjaya.co.id")]
    pub email: String,

    #[validate(length(min = 1, message = "Phone number is required"))]
    #[schema(example = "+62215550123")]
    pub phone_number: String,

    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,

    #[validate(length(min = 1, message = "Contact person is required"))]
    pub contact_person: String,
}

impl From<CreateClientRequest> for NewClient {
    fn from(request: CreateClientRequest) -> Self {
        NewClient {
            name: request.name,
            email: request.email,
            phone_number: request.phone_number,
            address: request.address,
            contact_person: request.contact_person,
        }
    }
}

/// Partial update; omitted or empty fields keep their stored value
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateClientRequest {
    pub name: Option<String>,
    #[validate(custom(function = "email_or_blank"))]
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

fn email_or_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() || value.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some(Cow::Borrowed("Invalid email format"));
    Err(error)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl From<UpdateClientRequest> for ClientChanges {
    fn from(request: UpdateClientRequest) -> Self {
        ClientChanges {
            name: non_blank(request.name),
            email: non_blank(request.email),
            phone_number: non_blank(request.phone_number),
            address: non_blank(request.address),
            contact_person: non_blank(request.contact_person),
        }
    }
}

/// List clients
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "clients",
    params(ListQuery),
    responses(
        (status = 200, description = "Page of clients", body = crate::response::ClientPage),
        (status = 400, description = "Invalid list parameters", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<PaginatedResponse<Client>, AppError> {
    query.validate::<Client>()?;
    let page = state.clients.list(&query.resolve::<Client>()).await?;
    Ok(PaginatedResponse::new("Successfully fetched clients", page))
}

/// Create a client
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "clients",
    request_body = CreateClientRequest,
    responses(
        (status = 200, description = "Client created", body = crate::response::ClientEnvelope),
        (status = 400, description = "Invalid request body", body = crate::error::ApiError),
        (status = 409, description = "Email or phone number already in use", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateClientRequest>,
) -> Result<ApiResponse<Client>, AppError> {
    let client = state.clients.create(request.into()).await?;
    tracing::info!(client_id = %client.uuid, "Client created");
    Ok(ApiResponse::ok("Successfully created client", client))
}

/// Fetch one client
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client UUID")),
    responses(
        (status = 200, description = "Client", body = crate::response::ClientEnvelope),
        (status = 400, description = "Invalid client ID", body = crate::error::ApiError),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Client>, AppError> {
    let id = parse_id(&id, INVALID_CLIENT_ID)?;
    let client = state.clients.get(id).await?;
    Ok(ApiResponse::ok("Successfully fetched client", client))
}

/// Update a client
#[utoipa::path(
    put,
    path = "/api/v1/clients/{id}/update",
    tag = "clients",
    params(("id" = String, Path, description = "Client UUID")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = crate::response::ClientEnvelope),
        (status = 400, description = "Invalid client ID or body", body = crate::error::ApiError),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
        (status = 409, description = "Email or phone number already in use", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateClientRequest>,
) -> Result<ApiResponse<Client>, AppError> {
    let id = parse_id(&id, INVALID_CLIENT_ID)?;
    let client = state.clients.update(id, request.into()).await?;
    Ok(ApiResponse::ok("Client updated successfully", client))
}

/// Soft-delete a client
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}/delete",
    tag = "clients",
    params(("id" = String, Path, description = "Client UUID")),
    responses(
        (status = 200, description = "Client deleted", body = crate::response::MessageResponse),
        (status = 400, description = "Invalid client ID", body = crate::error::ApiError),
        (status = 404, description = "Client not found", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_client(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_id(&id, INVALID_CLIENT_ID)?;
    state.clients.delete(id).await?;
    tracing::info!(client_id = %id, "Client deleted");
    Ok(ApiResponse::message("Client deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_drops_blank_fields() {
        let changes: ClientChanges = UpdateClientRequest {
            name: Some("PT Baru".to_string()),
            email: Some("  ".to_string()),
            ..Default::default()
        }
        .into();

        assert_eq!(changes.name.as_deref(), Some("PT Baru"));
        assert!(changes.email.is_none());
        assert!(changes.address.is_none());
    }

    #[test]
    fn test_update_request_email_validation() {
        let blank = UpdateClientRequest {
            email: Some(String::new()),
            ..Default::default()
        };
        assert!(blank.validate().is_ok());

        let bad = UpdateClientRequest {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_create_request_requires_fields() {
        let request = CreateClientRequest {
            name: String::new(),
            email: "info@sinarjaya.co.id".to_string(),
            phone_number: "+62215550123".to_string(),
            address: "Jl. Sudirman 1".to_string(),
            contact_person: "Andi".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }
}
