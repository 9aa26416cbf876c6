//! Record CRUDL handlers, generic over the record type. One monomorphized set per registered type.

use crate::error::AppError;
use crate::extractors::DbSession;
use crate::record::Record;
use crate::service::{CrudService, ShapeValidator};
use axum::{
    extract::{rejection::JsonRejection, Path, Query},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

pub async fn create<R: Record>(
    DbSession(mut session): DbSession,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<R>), AppError> {
    let Json(body) = body?;
    let created = CrudService::create::<R>(session.as_mut(), body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list<R: Record>(
    DbSession(mut session): DbSession,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<R>>, AppError> {
    let page = ShapeValidator::page(&params)?;
    let records = CrudService::list::<R>(session.as_mut(), page).await?;
    Ok(Json(records))
}

pub async fn read<R: Record>(
    DbSession(mut session): DbSession,
    Path(id_str): Path<String>,
) -> Result<Json<R>, AppError> {
    let id = ShapeValidator::path_id(&id_str)?;
    let record = CrudService::read::<R>(session.as_mut(), id).await?;
    Ok(Json(record))
}

pub async fn update<R: Record>(
    DbSession(mut session): DbSession,
    Path(id_str): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<R>, AppError> {
    let id = ShapeValidator::path_id(&id_str)?;
    let Json(body) = body?;
    let record = CrudService::update::<R>(session.as_mut(), id, body).await?;
    Ok(Json(record))
}

pub async fn delete<R: Record>(
    DbSession(mut session): DbSession,
    Path(id_str): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = ShapeValidator::path_id(&id_str)?;
    CrudService::delete::<R>(session.as_mut(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
