//! HTTP handlers.

use super::AppState;
use super::envelope::{Envelope, ok, ok_empty};
use super::session::{clear_cookie, read_cookie, session_cookie};
use crate::error::{ApiError, ApiResult};
use crate::guards::{AUTHENTICATED, EXISTING_TASK, OWNED_TASK};
use crate::types::{Credentials, NewTask, TaskId, TaskPatch};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::invalid_value("body", rejection.body_text())
}

/// Path ids that are not 24 hex characters do not name a task route at all.
fn parse_task_id(raw: &str) -> ApiResult<TaskId> {
    TaskId::parse(raw).ok_or_else(ApiError::not_found)
}

// =============================================================================
// Tasks
// =============================================================================

pub async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<Response> {
    let ctx = AUTHENTICATED.check(&state.db, state.context(&headers)?)?;
    let Json(input) = body.map_err(bad_body)?;

    let task = state.tasks.create(ctx.user()?, input)?;
    Ok(ok(StatusCode::OK, task))
}

pub async fn show_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let task_id = parse_task_id(&raw_id)?;
    let ctx = state.context(&headers)?.with_task_id(task_id);
    let ctx = EXISTING_TASK.check(&state.db, ctx)?;

    let tree = state.tasks.show(ctx.into_task()?)?;
    Ok(ok(StatusCode::OK, tree))
}

pub async fn edit_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<TaskPatch>, JsonRejection>,
) -> ApiResult<Response> {
    let task_id = parse_task_id(&raw_id)?;
    let ctx = state.context(&headers)?.with_task_id(task_id);
    let ctx = OWNED_TASK.check(&state.db, ctx)?;
    let Json(patch) = body.map_err(bad_body)?;

    let updated = state.tasks.edit(&ctx.into_task()?, patch)?;
    Ok(ok(StatusCode::OK, updated))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let task_id = parse_task_id(&raw_id)?;
    let ctx = state.context(&headers)?.with_task_id(task_id);
    let ctx = OWNED_TASK.check(&state.db, ctx)?;

    state.tasks.delete(&ctx.into_task()?)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

// =============================================================================
// Users
// =============================================================================

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(creds) = body.map_err(bad_body)?;
    let user = state.accounts.register(creds)?;
    Ok(ok(StatusCode::CREATED, user))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(creds) = body.map_err(bad_body)?;
    let session = state.accounts.login(&creds)?;

    let cookie = session_cookie(&state.cookie_name, &session.token, session.ttl_secs);
    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(Envelope {
            status: "ok",
            result: "",
        }),
    )
        .into_response())
}

pub async fn am_i_logged_in(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let ctx = state.context(&headers)?;
    Ok(ok(StatusCode::OK, ctx.user.is_some()))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    if let Some(token) = read_cookie(&headers, &state.cookie_name) {
        state.accounts.logout(&token)?;
    }

    let mut response = ok_empty();
    if let Ok(value) = clear_cookie(&state.cookie_name).parse() {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    Ok(response)
}

// =============================================================================
// Misc
// =============================================================================

pub async fn health() -> Response {
    ok(
        StatusCode::OK,
        json!({ "version": env!("CARGO_PKG_VERSION") }),
    )
}

pub async fn fallback() -> ApiError {
    ApiError::not_found()
}
