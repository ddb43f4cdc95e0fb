//! HTTP handlers, one per method. Each classifies the operation token and
//! hands off to the dispatcher; `own` forwards the raw request to the
//! model's custom route.

use crate::error::AppError;
use crate::model::OperationKind;
use crate::response::{empty_ok, json_ok, no_content};
use crate::state::AppState;
use crate::storage::Filter;
use axum::body::Bytes;
use axum::extract::{Path, Query, Request, State};
use axum::http::Method;
use axum::response::Response;

const BODY_LIMIT: usize = 2 * 1024 * 1024;

async fn read_body(req: Request) -> Result<Bytes, AppError> {
    axum::body::to_bytes(req.into_body(), BODY_LIMIT)
        .await
        .map_err(|e| AppError::internal("read request body", e))
}

fn parse_id(arg: Option<&str>) -> Result<i64, AppError> {
    let arg = arg.ok_or_else(|| AppError::BadRequest("missing id in path".into()))?;
    arg.parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id '{arg}'")))
}

fn wrong_operation(op: &str) -> AppError {
    AppError::BadRequest(format!("wrong path - operation '{op}'"))
}

pub async fn get_root(
    State(state): State<AppState>,
    Path((model, op)): Path<(String, String)>,
    Query(filter): Query<Filter>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_get(state, model, op, None, filter, req).await
}

pub async fn get_arg(
    State(state): State<AppState>,
    Path((model, op, arg)): Path<(String, String, String)>,
    Query(filter): Query<Filter>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_get(state, model, op, Some(arg), filter, req).await
}

async fn dispatch_get(
    state: AppState,
    model: String,
    op: String,
    arg: Option<String>,
    filter: Filter,
    req: Request,
) -> Result<Response, AppError> {
    let d = &state.dispatcher;
    match OperationKind::classify(&op) {
        OperationKind::GetOne => Ok(json_ok(d.get_one(&model, &filter).await?)),
        OperationKind::GetMany => Ok(json_ok(d.get_many(&model, &filter).await?)),
        OperationKind::Own => {
            let pattern = arg.unwrap_or_default();
            Ok(json_ok(d.own(&model, Method::GET, &pattern, req).await?))
        }
        _ => Err(wrong_operation(&op)),
    }
}

pub async fn post_root(
    State(state): State<AppState>,
    Path((model, op)): Path<(String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_post(state, model, op, None, req).await
}

pub async fn post_arg(
    State(state): State<AppState>,
    Path((model, op, arg)): Path<(String, String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_post(state, model, op, Some(arg), req).await
}

async fn dispatch_post(
    state: AppState,
    model: String,
    op: String,
    arg: Option<String>,
    req: Request,
) -> Result<Response, AppError> {
    let d = &state.dispatcher;
    match OperationKind::classify(&op) {
        OperationKind::AddOne => {
            let body = read_body(req).await?;
            d.add_one(&model, &body).await?;
            Ok(empty_ok())
        }
        OperationKind::AddMany => {
            let body = read_body(req).await?;
            d.add_many(&model, &body).await?;
            Ok(empty_ok())
        }
        OperationKind::Own => {
            let pattern = arg.unwrap_or_default();
            Ok(json_ok(d.own(&model, Method::POST, &pattern, req).await?))
        }
        _ => Err(wrong_operation(&op)),
    }
}

pub async fn put_root(
    State(state): State<AppState>,
    Path((model, op)): Path<(String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_put(state, model, op, None, req).await
}

pub async fn put_arg(
    State(state): State<AppState>,
    Path((model, op, arg)): Path<(String, String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_put(state, model, op, Some(arg), req).await
}

async fn dispatch_put(
    state: AppState,
    model: String,
    op: String,
    arg: Option<String>,
    req: Request,
) -> Result<Response, AppError> {
    let d = &state.dispatcher;
    match OperationKind::classify(&op) {
        OperationKind::Update => {
            let id = parse_id(arg.as_deref())?;
            let body = read_body(req).await?;
            d.update(&model, id, &body).await?;
            Ok(empty_ok())
        }
        OperationKind::Own => {
            let pattern = arg.unwrap_or_default();
            Ok(json_ok(d.own(&model, Method::PUT, &pattern, req).await?))
        }
        _ => Err(wrong_operation(&op)),
    }
}

pub async fn delete_root(
    State(state): State<AppState>,
    Path((model, op)): Path<(String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_delete(state, model, op, None, req).await
}

pub async fn delete_arg(
    State(state): State<AppState>,
    Path((model, op, arg)): Path<(String, String, String)>,
    req: Request,
) -> Result<Response, AppError> {
    dispatch_delete(state, model, op, Some(arg), req).await
}

async fn dispatch_delete(
    state: AppState,
    model: String,
    op: String,
    arg: Option<String>,
    req: Request,
) -> Result<Response, AppError> {
    let d = &state.dispatcher;
    match OperationKind::classify(&op) {
        kind @ (OperationKind::DeleteOne | OperationKind::DeleteMany) => {
            let id = parse_id(arg.as_deref())?;
            d.delete(&model, kind, id).await?;
            Ok(no_content())
        }
        OperationKind::Own => {
            let pattern = arg.unwrap_or_default();
            Ok(json_ok(d.own(&model, Method::DELETE, &pattern, req).await?))
        }
        _ => Err(wrong_operation(&op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_integers_only() {
        assert_eq!(parse_id(Some("42")).unwrap(), 42);
        assert!(parse_id(Some("forty-two")).is_err());
        assert!(parse_id(None).is_err());
        assert_eq!(
            parse_id(Some("x")).unwrap_err().status(),
            axum::http::StatusCode::BAD_REQUEST
        );
    }
}
