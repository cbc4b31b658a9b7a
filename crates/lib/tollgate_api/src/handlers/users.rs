//! Account registration.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tollgate_core::commands::CreateUser;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::AppJson;
use crate::models::{CreateUserRequest, CreateUserResponse};

/// `POST /user` — register a local account.
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(body): AppJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let mut command = CreateUser::default();
    state.mapper.map_strict(&body, &mut command)?;

    let reply = state.mediator.send(&state.request_context(), command).await?;
    let response: CreateUserResponse = state.mapper.map_into(reply.user())?;
    Ok((StatusCode::CREATED, Json(response)))
}
