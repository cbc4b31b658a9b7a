//! Token endpoints and the authenticated probes behind them.

use axum::extract::State;
use axum::http::header::{CACHE_CONTROL, PRAGMA};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use tollgate_core::commands::{IssueToken, RefreshToken};
use tollgate_core::mediator::Reply;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::{AppForm, AppJson};
use crate::middleware::auth::{AuthenticatedPrincipal, RefreshGrant};
use crate::models::{AdminResponse, PrincipalResponse, RefreshRequest, TokenForm, TokenResponse};

fn token_response(state: &AppState, reply: Reply) -> AppResult<Response> {
    let response: TokenResponse = state.mapper.map_into(reply.user())?;
    Ok((
        [(CACHE_CONTROL, "no-store"), (PRAGMA, "no-cache")],
        Json(response),
    )
        .into_response())
}

/// `POST /oauth/token` — `password` and `refresh_token` grants (form encoded).
pub async fn issue_token(
    State(state): State<AppState>,
    grant: Option<Extension<RefreshGrant>>,
    AppForm(form): AppForm<TokenForm>,
) -> AppResult<Response> {
    let mut command = IssueToken::default();
    state.mapper.map_strict(&form, &mut command)?;

    let mut ctx = state.request_context();
    if let Some(Extension(grant)) = grant {
        ctx = ctx.with_refresh_subject(grant.subject);
        if command.refresh_token.as_deref().is_none_or(str::is_empty) {
            command.refresh_token = Some(grant.token);
        }
    }

    let reply = state.mediator.send(&ctx, command).await?;
    token_response(&state, reply)
}

/// `POST /oauth/refresh` — exchange a refresh token (JSON).
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(body): AppJson<RefreshRequest>,
) -> AppResult<Response> {
    let mut command = RefreshToken::default();
    state.mapper.map_strict(&body, &mut command)?;

    let reply = state.mediator.send(&state.request_context(), command).await?;
    token_response(&state, reply)
}

/// `GET /oauth/me` — the authenticated principal.
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthenticatedPrincipal(principal)): Extension<AuthenticatedPrincipal>,
) -> AppResult<Json<PrincipalResponse>> {
    let mut response = PrincipalResponse::default();
    state.mapper.map_strict(&principal, &mut response)?;
    Ok(Json(response))
}

/// `GET /oauth/admin` — reachable only with the `admin` role.
pub async fn admin(
    Extension(AuthenticatedPrincipal(principal)): Extension<AuthenticatedPrincipal>,
) -> Json<AdminResponse> {
    Json(AdminResponse {
        message: format!("Welcome, {}", principal.name),
    })
}
