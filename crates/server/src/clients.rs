//! Client API endpoints

use api_types::client::{ClientCreated, ClientNew, ClientUpdate, ClientView, ClientsResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn view(client: engine::Client) -> ClientView {
    ClientView {
        id: client.id,
        name: client.name,
        email: client.email,
        phone: client.phone,
        address: client.address,
        note: client.note,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ClientNew>,
) -> Result<(StatusCode, Json<ClientCreated>), ServerError> {
    let id = state
        .engine
        .new_client(engine::NewClientCmd {
            user_id: user.id.clone(),
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            note: payload.note,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ClientCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ClientsResponse>, ServerError> {
    let clients = state.engine.list_clients(&user.id).await?;

    Ok(Json(ClientsResponse {
        clients: clients.into_iter().map(view).collect(),
    }))
}

pub async fn get_one(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ClientView>, ServerError> {
    let client = state.engine.client(&user.id, id).await?;

    Ok(Json(view(client)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ClientUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_client(engine::UpdateClientCmd {
            user_id: user.id.clone(),
            client_id: id,
            name: payload.name,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
            note: payload.note,
        })
        .await?;

    Ok(StatusCode::OK)
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_client(&user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
