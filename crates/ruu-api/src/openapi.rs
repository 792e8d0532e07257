//! OpenAPI document served by Swagger UI

use crate::auth::{LoginRequest, LoginResponse, LogoutRequest, RefreshRequest, TokenPair};
use crate::error::ApiError;
use crate::handlers::{self, clients, features, health, properties, users};
use crate::response::{
    ClientEnvelope, ClientPage, FeatureEnvelope, LoginEnvelope, MessageResponse, PropertyEnvelope,
    PropertyPage, TokenEnvelope, UserEnvelope, UserPage,
};
use ruu_core::{Client, Feature, PaginationMeta, Property, User, UserRole};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "RUU Properties API",
        description = "Property rental backend: accounts, clients, features and properties"
    ),
    paths(
        health::health_check,
        health::ping,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        users::register_handler,
        users::me_handler,
        users::list_users,
        clients::list_clients,
        clients::create_client,
        clients::get_client,
        clients::update_client,
        clients::delete_client,
        features::create_feature,
        properties::create_property,
        properties::list_properties,
    ),
    components(schemas(
        ApiError,
        MessageResponse,
        health::PingResponse,
        health::HealthResponse,
        LoginRequest,
        LoginResponse,
        RefreshRequest,
        LogoutRequest,
        TokenPair,
        users::RegisterForm,
        clients::CreateClientRequest,
        clients::UpdateClientRequest,
        features::CreateFeatureRequest,
        properties::CreatePropertyRequest,
        Client,
        Feature,
        Property,
        User,
        UserRole,
        PaginationMeta,
        ClientEnvelope,
        FeatureEnvelope,
        PropertyEnvelope,
        UserEnvelope,
        LoginEnvelope,
        TokenEnvelope,
        ClientPage,
        PropertyPage,
        UserPage,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness probes"),
        (name = "auth", description = "Login, logout and token refresh"),
        (name = "users", description = "Registration and accounts"),
        (name = "clients", description = "Client records"),
        (name = "features", description = "Property features"),
        (name = "properties", description = "Property listings"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_security() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();

        assert!(json["paths"]["/api/v1/auth/login"]["post"].is_object());
        assert!(json["paths"]["/api/v1/clients/{id}/update"]["put"].is_object());
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
        assert!(json["components"]["schemas"]["ClientPage"].is_object());
    }
}
