//! Invoice API endpoints

use api_types::invoice::{
    InvoiceCreated, InvoiceDetailResponse, InvoiceItemView, InvoiceList, InvoiceListResponse,
    InvoiceNew, InvoiceStatus as ApiStatus, InvoiceUpdate, InvoiceView, LineNew, SweepOverdue,
    SweepOverdueResponse,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::Money;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_status(status: engine::InvoiceStatus) -> ApiStatus {
    match status {
        engine::InvoiceStatus::Draft => ApiStatus::Draft,
        engine::InvoiceStatus::Pending => ApiStatus::Pending,
        engine::InvoiceStatus::Paid => ApiStatus::Paid,
        engine::InvoiceStatus::Partial => ApiStatus::Partial,
        engine::InvoiceStatus::Overdue => ApiStatus::Overdue,
        engine::InvoiceStatus::Cancelled => ApiStatus::Cancelled,
    }
}

fn map_status_to_engine(status: ApiStatus) -> engine::InvoiceStatus {
    match status {
        ApiStatus::Draft => engine::InvoiceStatus::Draft,
        ApiStatus::Pending => engine::InvoiceStatus::Pending,
        ApiStatus::Paid => engine::InvoiceStatus::Paid,
        ApiStatus::Partial => engine::InvoiceStatus::Partial,
        ApiStatus::Overdue => engine::InvoiceStatus::Overdue,
        ApiStatus::Cancelled => engine::InvoiceStatus::Cancelled,
    }
}

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Idr => api_types::Currency::Idr,
    }
}

fn map_lines(items: Vec<LineNew>) -> Vec<engine::LineInput> {
    items
        .into_iter()
        .map(|line| engine::LineInput {
            product_id: line.product_id,
            quantity: line.quantity,
            description: line.description,
        })
        .collect()
}

fn view(invoice: &engine::Invoice) -> InvoiceView {
    InvoiceView {
        id: invoice.id,
        client_id: invoice.client_id,
        recurring_invoice_id: invoice.recurring_invoice_id,
        number: invoice.number.clone(),
        status: map_status(invoice.status),
        issue_date: invoice.issue_date,
        due_date: invoice.due_date,
        subtotal_minor: invoice.subtotal.minor(),
        tax_minor: invoice.tax.minor(),
        discount_minor: invoice.discount.minor(),
        total_minor: invoice.total.minor(),
        currency: map_currency(invoice.currency),
        note: invoice.note.clone(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<InvoiceNew>,
) -> Result<(StatusCode, Json<InvoiceCreated>), ServerError> {
    let id = state
        .engine
        .new_invoice(engine::NewInvoiceCmd {
            user_id: user.id.clone(),
            client_id: payload.client_id,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            items: map_lines(payload.items),
            discount: Money::new(payload.discount_minor.unwrap_or(0)),
            note: payload.note,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(InvoiceCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<InvoiceList>,
) -> Result<Json<InvoiceListResponse>, ServerError> {
    let limit = payload.limit.unwrap_or(50);
    let filter = engine::InvoiceListFilter {
        statuses: payload
            .statuses
            .map(|statuses| statuses.into_iter().map(map_status_to_engine).collect()),
        client_id: payload.client_id,
        from: payload.from,
        to: payload.to,
    };

    let (invoices, next_cursor) = state
        .engine
        .list_invoices_page(&user.id, limit, payload.cursor.as_deref(), &filter)
        .await?;

    Ok(Json(InvoiceListResponse {
        invoices: invoices.iter().map(view).collect(),
        next_cursor,
    }))
}

pub async fn get_detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceDetailResponse>, ServerError> {
    let invoice = state.engine.invoice_with_items(&user.id, id).await?;

    let items = invoice
        .items
        .iter()
        .map(|item| InvoiceItemView {
            product_id: item.product_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price_minor: item.unit_price.minor(),
            tax_rate_bps: item.tax_rate_bps,
            tax_minor: item.tax.minor(),
            amount_minor: item.amount.minor(),
        })
        .collect();

    Ok(Json(InvoiceDetailResponse {
        invoice: view(&invoice),
        items,
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InvoiceUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_invoice(engine::UpdateInvoiceCmd {
            user_id: user.id.clone(),
            invoice_id: id,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            items: map_lines(payload.items),
            discount: Money::new(payload.discount_minor.unwrap_or(0)),
            note: payload.note,
        })
        .await?;

    Ok(StatusCode::OK)
}

pub async fn issue(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.issue_invoice(&user.id, id).await?;

    Ok(StatusCode::OK)
}

pub async fn cancel(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.cancel_invoice(&user.id, id).await?;

    Ok(StatusCode::OK)
}

pub async fn sweep_overdue(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SweepOverdue>,
) -> Result<Json<SweepOverdueResponse>, ServerError> {
    let as_of = payload.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let invoice_ids = state.engine.sweep_overdue_for_user(&user.id, as_of).await?;

    Ok(Json(SweepOverdueResponse { invoice_ids }))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_invoice(&user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
