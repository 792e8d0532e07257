//! Success envelopes shared by all handlers

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ruu_core::{Client, Feature, PaginationMeta, Property, User};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::models::LoginResponse;
use crate::auth::tokens::TokenPair;

/// `{success, message, data?}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    ClientEnvelope = ApiResponse<Client>,
    FeatureEnvelope = ApiResponse<Feature>,
    PropertyEnvelope = ApiResponse<Property>,
    UserEnvelope = ApiResponse<User>,
    LoginEnvelope = ApiResponse<LoginResponse>,
    TokenEnvelope = ApiResponse<TokenPair>
)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Schema of a success envelope without `data`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    #[schema(example = "Client deleted successfully")]
    pub message: String,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `{success, message, data, meta}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[aliases(
    ClientPage = PaginatedResponse<Client>,
    PropertyPage = PaginatedResponse<Property>,
    UserPage = PaginatedResponse<User>
)]
pub struct PaginatedResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T: Serialize> PaginatedResponse<T> {
    pub fn new(message: impl Into<String>, (data, meta): (Vec<T>, PaginationMeta)) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            meta,
        }
    }
}

impl<T: Serialize> IntoResponse for PaginatedResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_envelope_omits_data() {
        let json = serde_json::to_value(ApiResponse::message("Client deleted successfully")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Client deleted successfully");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_paginated_envelope_shape() {
        let page = PaginatedResponse::new(
            "Successfully fetched clients",
            (vec![1, 2], PaginationMeta::new(1, 2, 5)),
        );
        let json = serde_json::to_value(page).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["meta"]["total_pages"], 3);
        assert_eq!(json["meta"]["total"], 5);
    }
}
