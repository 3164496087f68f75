//! Generic resource routes
//!
//! Every entity kind gets the same REST surface, mounted at `/api/{kind}`:
//!
//! - `GET /` - list all records in id order
//! - `POST /` - create a record (body must not carry an id)
//! - `DELETE /?field=<name>&value=<v>` - delete every record whose field equals `v`
//! - `DELETE /?field=<name>&null=true` - delete every record whose field is null
//! - `GET /:id` - fetch one record
//! - `PUT /:id` - replace an existing record
//! - `DELETE /:id` - delete one record
//!
//! Handlers only ever talk to a [`Repository`]; the backend behind it is
//! chosen at startup.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use roster_common::ValidationError;
use serde::Deserialize;
use std::sync::Arc;

use crate::api::response::deleted;
use crate::entity::{Entity, EntityId, FieldValue};
use crate::error::{ApiResult, AppError};
use crate::repository::Repository;

/// Handler state for one kind
pub type ResourceState<T> = Arc<dyn Repository<T>>;

/// Query string of a bulk delete. Exactly one of `value` and `null=true`
/// must be given.
#[derive(Debug, Deserialize)]
pub struct DeleteFilter {
    pub field: String,
    pub value: Option<String>,
    #[serde(default)]
    pub null: bool,
}

impl DeleteFilter {
    fn target(&self) -> Result<FieldValue, AppError> {
        match (&self.value, self.null) {
            (Some(value), false) => Ok(FieldValue::from(value.as_str())),
            (None, true) => Ok(FieldValue::Null),
            (Some(_), true) => Err(AppError::BadRequest(
                "Give either value or null=true, not both".to_string(),
            )),
            (None, false) => Err(AppError::BadRequest(format!(
                "Missing value for field '{}'; use null=true to match empty fields",
                self.field
            ))),
        }
    }
}

/// Creates the router for one entity kind
pub fn resource_routes<T: Entity>() -> Router<ResourceState<T>> {
    Router::new()
        .route(
            "/",
            get(list_resources::<T>)
                .post(create_resource::<T>)
                .delete(delete_matching::<T>),
        )
        .route(
            "/:id",
            get(get_resource::<T>)
                .put(update_resource::<T>)
                .delete(delete_resource::<T>),
        )
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind))]
async fn list_resources<T: Entity>(State(repo): State<ResourceState<T>>) -> ApiResult<Response> {
    let items = repo.find_all().await?;
    tracing::debug!(count = items.len(), "Listed resources");
    Ok(Json(items).into_response())
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind, id = %raw_id))]
async fn get_resource<T: Entity>(
    State(repo): State<ResourceState<T>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Response> {
    let id: EntityId = raw_id.parse()?;

    match repo.find_by_id(id).await? {
        Some(entity) => Ok(Json(entity).into_response()),
        None => Err(AppError::NotFound(id)),
    }
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind))]
async fn create_resource<T: Entity>(
    State(repo): State<ResourceState<T>>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(entity) = payload?;
    if entity.id().is_some() {
        return Err(ValidationError::UnexpectedId {
            kind: T::schema().kind.to_string(),
        }
        .into());
    }

    let saved = repo.save(entity).await?;
    tracing::info!(id = ?saved.id(), "Resource created via API");

    Ok((StatusCode::CREATED, Json(saved)).into_response())
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind, id = %raw_id))]
async fn update_resource<T: Entity>(
    State(repo): State<ResourceState<T>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult<Response> {
    let id: EntityId = raw_id.parse()?;
    let Json(mut entity) = payload?;
    entity.set_id(id);

    match repo.update(entity).await? {
        Some(saved) => {
            tracing::info!(%id, "Resource updated via API");
            Ok(Json(saved).into_response())
        },
        None => Err(AppError::NotFound(id)),
    }
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind, id = %raw_id))]
async fn delete_resource<T: Entity>(
    State(repo): State<ResourceState<T>>,
    Path(raw_id): Path<String>,
) -> ApiResult<Response> {
    let id: EntityId = raw_id.parse()?;

    if repo.delete_by_id(id).await? {
        tracing::info!(%id, "Resource deleted via API");
        Ok(deleted(id))
    } else {
        Err(AppError::NotFound(id))
    }
}

#[tracing::instrument(skip_all, fields(kind = T::schema().kind))]
async fn delete_matching<T: Entity>(
    State(repo): State<ResourceState<T>>,
    filter: Result<Query<DeleteFilter>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(filter) = filter?;
    let value = filter.target()?;

    let count = repo.delete_where(&filter.field, value).await?;
    tracing::info!(field = %filter.field, count, "Bulk delete via API");

    Ok(deleted(count))
}
