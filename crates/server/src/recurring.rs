//! Recurring invoice template API endpoints

use api_types::recurring::{
    GenerateRequest, GenerateResponse, GeneratedInvoiceView, RecurringCreated,
    RecurringDetailResponse, RecurringItemView, RecurringListResponse, RecurringNew,
    RecurringPattern as ApiPattern, RecurringSetActive, RecurringUpdate, RecurringView,
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

fn map_pattern(pattern: engine::RecurringPattern) -> ApiPattern {
    match pattern {
        engine::RecurringPattern::Weekly => ApiPattern::Weekly,
        engine::RecurringPattern::Biweekly => ApiPattern::Biweekly,
        engine::RecurringPattern::Monthly => ApiPattern::Monthly,
        engine::RecurringPattern::Quarterly => ApiPattern::Quarterly,
        engine::RecurringPattern::Semiannually => ApiPattern::Semiannually,
        engine::RecurringPattern::Annually => ApiPattern::Annually,
    }
}

fn map_pattern_to_engine(pattern: ApiPattern) -> engine::RecurringPattern {
    match pattern {
        ApiPattern::Weekly => engine::RecurringPattern::Weekly,
        ApiPattern::Biweekly => engine::RecurringPattern::Biweekly,
        ApiPattern::Monthly => engine::RecurringPattern::Monthly,
        ApiPattern::Quarterly => engine::RecurringPattern::Quarterly,
        ApiPattern::Semiannually => engine::RecurringPattern::Semiannually,
        ApiPattern::Annually => engine::RecurringPattern::Annually,
    }
}

fn map_lines(items: Vec<api_types::invoice::LineNew>) -> Vec<engine::LineInput> {
    items
        .into_iter()
        .map(|line| engine::LineInput {
            product_id: line.product_id,
            quantity: line.quantity,
            description: line.description,
        })
        .collect()
}

fn view(template: &engine::RecurringInvoice) -> RecurringView {
    RecurringView {
        id: template.id,
        client_id: template.client_id,
        pattern: map_pattern(template.pattern),
        start_date: template.start_date,
        next_invoice_date: template.next_invoice_date,
        end_date: template.end_date,
        due_in_days: template.due_in_days,
        discount_minor: template.discount.minor(),
        is_active: template.is_active,
        note: template.note.clone(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<RecurringNew>,
) -> Result<(StatusCode, Json<RecurringCreated>), ServerError> {
    let id = state
        .engine
        .new_recurring(engine::NewRecurringCmd {
            user_id: user.id.clone(),
            client_id: payload.client_id,
            pattern: map_pattern_to_engine(payload.pattern),
            start_date: payload.start_date,
            end_date: payload.end_date,
            due_in_days: payload.due_in_days,
            items: map_lines(payload.items),
            discount: Money::new(payload.discount_minor.unwrap_or(0)),
            note: payload.note,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(RecurringCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<RecurringListResponse>, ServerError> {
    let templates = state.engine.list_recurring(&user.id).await?;

    Ok(Json(RecurringListResponse {
        recurring: templates.iter().map(view).collect(),
    }))
}

pub async fn get_detail(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RecurringDetailResponse>, ServerError> {
    let template = state.engine.recurring_with_items(&user.id, id).await?;

    let items = template
        .items
        .iter()
        .map(|item| RecurringItemView {
            product_id: item.product_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price_minor: item.unit_price.minor(),
            tax_rate_bps: item.tax_rate_bps,
        })
        .collect();

    Ok(Json(RecurringDetailResponse {
        recurring: view(&template),
        items,
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecurringUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .update_recurring(engine::UpdateRecurringCmd {
            user_id: user.id.clone(),
            recurring_id: id,
            pattern: map_pattern_to_engine(payload.pattern),
            end_date: payload.end_date,
            due_in_days: payload.due_in_days,
            items: map_lines(payload.items),
            discount: Money::new(payload.discount_minor.unwrap_or(0)),
            note: payload.note,
            next_invoice_date: payload.next_invoice_date,
        })
        .await?;

    Ok(StatusCode::OK)
}

pub async fn set_active(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecurringSetActive>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_recurring_active(&user.id, id, payload.is_active)
        .await?;

    Ok(StatusCode::OK)
}

pub async fn generate(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let as_of = payload.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let generated = state
        .engine
        .generate_due_invoices_for_user(&user.id, as_of)
        .await?;

    Ok(Json(GenerateResponse {
        generated: generated
            .into_iter()
            .map(|item| GeneratedInvoiceView {
                recurring_invoice_id: item.recurring_invoice_id,
                invoice_id: item.invoice_id,
                number: item.number,
                issue_date: item.issue_date,
                total_minor: item.total.minor(),
            })
            .collect(),
    }))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_recurring(&user.id, id).await?;

    Ok(StatusCode::NO_CONTENT)
}
