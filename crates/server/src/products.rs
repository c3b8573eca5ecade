//! Product catalogue API endpoints

use api_types::product::{
    ProductCreated, ProductNew, ProductUpdate, ProductView, ProductsResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::Money;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn view(product: engine::Product) -> ProductView {
    ProductView {
        id: product.id,
        name: product.name,
        description: product.description,
        unit: product.unit,
        price_minor: product.price.minor(),
        tax_rate_bps: product.tax_rate_bps,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ProductNew>,
) -> Result<(StatusCode, Json<ProductCreated>), ServerError> {
    let id = state
        .engine
        .new_product(engine::NewProductCmd {
            user_id: user.id.clone(),
            name: payload.name,
            description: payload.description,
            unit: payload.unit,
            price: Money::new(payload.price_minor),
            tax_rate_bps: payload.tax_rate_bps,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ProductCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ProductsResponse>, ServerError> {
    let products = state.engine.list_products(&user.id).await?;

    Ok(Json(ProductsResponse {
        products: products.into_iter().map(view).collect(),
    }))
}

pub async fn get_one(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductView>, ServerError> {
    let product = state.engine.product(&user.id, id).await?;

    Ok(Json(view(product)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProductUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_product(engine::UpdateProductCmd {
            user_id: user.id.clone(),
            product_id: id,
            name: payload.name,
            description: payload.description,
            unit: payload.unit,
            price: Money::new(payload.price_minor),
            tax_rate_bps: payload.tax_rate_bps,
        })
        .await?;

    Ok(StatusCode::OK)
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_product(&user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
