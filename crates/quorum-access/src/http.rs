use crate::errors::AccessError;
use crate::reconcile::SyncPublisher;
use crate::service::{AccessService, GrantRequest};
use crate::store::AccessStore;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use quorum_types::prelude::*;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

pub struct ApiError(pub AccessError);

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0 .0.http_status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0 .0.to_public())).into_response()
    }
}

#[derive(Deserialize)]
struct ListQuery {
    role: Option<String>,
}

#[derive(Deserialize)]
struct CreateQuery {
    participant_limit: Option<u32>,
}

/// Internal-plane HTTP surface over [`AccessService`]. Callers are other
/// services inside the trust boundary; there is no end-user authentication
/// here.
pub fn router<S, P>(service: Arc<AccessService<S, P>>) -> Router
where
    S: AccessStore + Clone + 'static,
    P: SyncPublisher + 'static,
{
    Router::new()
        .route("/access/", post(create::<S, P>))
        .route("/access/by-room/:room_id", get(list_by_room::<S, P>))
        .route("/access/by-user/:user_id", get(list_by_user::<S, P>))
        .route("/access/sync/:room_id/:revision", post(request_sync::<S, P>))
        .route(
            "/access/:room_id/:user_id",
            get(resolve::<S, P>).delete(delete_grant::<S, P>),
        )
        .route("/access/:room_id", delete(delete_all::<S, P>))
        .with_state(service)
}

async fn resolve<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<Json<AccessGrant>, ApiError> {
    let grant = service
        .resolve(&RoomId(room_id), &UserId(user_id))
        .await?;
    Ok(Json(grant))
}

async fn list_by_room<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path(room_id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<AccessGrant>>, ApiError> {
    let role = match query.role.as_deref() {
        Some(raw) => Some(
            Role::from_str(raw)
                .map_err(|_| AccessError::bad_request(&format!("unknown role {raw}")))?,
        ),
        None => None,
    };
    let grants = service.list_by_room(&RoomId(room_id), role).await?;
    Ok(Json(grants))
}

async fn list_by_user<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<AccessGrant>>, ApiError> {
    let grants = service.list_by_user(&UserId(user_id)).await?;
    Ok(Json(grants))
}

async fn create<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Query(query): Query<CreateQuery>,
    Json(request): Json<GrantRequest>,
) -> Result<Json<AccessGrant>, ApiError> {
    let grant = service.create(&request, query.participant_limit).await?;
    Ok(Json(grant))
}

async fn request_sync<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path((room_id, revision)): Path<(String, String)>,
) -> Result<Json<RoomSyncTracker>, ApiError> {
    let tracker = service
        .request_sync(&RoomId(room_id), &Revision(revision))
        .await?;
    Ok(Json(tracker))
}

async fn delete_grant<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path((room_id, user_id)): Path<(String, String)>,
) -> Result<Json<AccessGrant>, ApiError> {
    let removed = service.delete(&RoomId(room_id), &UserId(user_id)).await?;
    Ok(Json(removed))
}

async fn delete_all<S: AccessStore + Clone + 'static, P: SyncPublisher + 'static>(
    State(service): State<Arc<AccessService<S, P>>>,
    Path(room_id): Path<String>,
) -> Result<Json<Vec<AccessGrant>>, ApiError> {
    let removed = service.delete_all_for_room(&RoomId(room_id)).await?;
    Ok(Json(removed))
}
