//! # tollgate_api
//!
//! HTTP API library for Tollgate.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mapping;
pub mod middleware;
pub mod models;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tollgate_core::clock::Clock;
use tollgate_core::commands::{CreateUser, IssueToken, RefreshToken};
use tollgate_core::config::{AuthConfig, ConfigError};
use tollgate_core::context::RequestContext;
use tollgate_core::handlers::create_user::ADMIN_ROLE;
use tollgate_core::handlers::{CreateUserHandler, IssueTokenHandler, RefreshTokenHandler};
use tollgate_core::mapper::Mapper;
use tollgate_core::mediator::Mediator;
use tollgate_core::password::BcryptHasher;
use tollgate_core::repository::UserRepository;
use tollgate_core::token::TokenService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{health, oauth, users};
use crate::middleware::auth::RoleGate;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub mediator: Arc<Mediator>,
    pub mapper: Arc<Mapper>,
    pub tokens: Arc<TokenService>,
    /// API configuration.
    pub config: ApiConfig,
    /// Parent of every request's cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Wire the token service, handlers, mediator and mapper around `users`.
    pub fn build(
        config: ApiConfig,
        users: Arc<dyn UserRepository>,
        clock: Arc<dyn Clock>,
        shutdown: CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.auth.validate()?;
        let auth: Arc<AuthConfig> = Arc::new(config.auth.clone());

        let tokens = Arc::new(
            TokenService::new(auth.jwt_secret.as_bytes(), clock.clone()).map_err(|e| {
                ConfigError::Invalid {
                    name: "JWT_SECRET",
                    reason: e.to_string(),
                }
            })?,
        );
        let hasher = Arc::new(BcryptHasher::new(auth.bcrypt_cost));

        let mediator = Mediator::builder()
            .register::<CreateUser>(Arc::new(CreateUserHandler::new(
                users.clone(),
                hasher.clone(),
                clock.clone(),
                auth.clone(),
            )))
            .register::<IssueToken>(Arc::new(IssueTokenHandler::new(
                users.clone(),
                hasher,
                tokens.clone(),
                clock,
                auth,
            )))
            .register::<RefreshToken>(Arc::new(
                RefreshTokenHandler::new(users, tokens.clone()),
            ))
            .build();

        Ok(Self {
            mapper: Arc::new(mapping::api_mapper(tokens.access_ttl())),
            mediator: Arc::new(mediator),
            tokens,
            config,
            shutdown,
        })
    }

    /// Fresh context for one request, cancelled with the server.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::new(self.shutdown.child_token())
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/user", post(users::create_user))
        .route("/oauth/refresh", post(oauth::refresh))
        .route(
            "/oauth/token",
            post(oauth::issue_token).layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::auth::refresh_gate,
            )),
        );

    // Admin routes (require the admin role)
    let admin = Router::new()
        .route("/oauth/admin", get(oauth::admin))
        .layer(axum::middleware::from_fn_with_state(
            RoleGate::new(ADMIN_ROLE),
            middleware::auth::require_role,
        ));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/oauth/me", get(oauth::me))
        .merge(admin)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.config.errors,
            error::apply_error_policy,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
