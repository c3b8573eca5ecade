//! Payment API endpoints

use api_types::payment::{
    PaymentCreated, PaymentMethod as ApiMethod, PaymentNew, PaymentView, PaymentsResponse,
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

fn map_method(method: engine::PaymentMethod) -> ApiMethod {
    match method {
        engine::PaymentMethod::Cash => ApiMethod::Cash,
        engine::PaymentMethod::BankTransfer => ApiMethod::BankTransfer,
        engine::PaymentMethod::EWallet => ApiMethod::EWallet,
        engine::PaymentMethod::Other => ApiMethod::Other,
    }
}

fn map_method_to_engine(method: ApiMethod) -> engine::PaymentMethod {
    match method {
        ApiMethod::Cash => engine::PaymentMethod::Cash,
        ApiMethod::BankTransfer => engine::PaymentMethod::BankTransfer,
        ApiMethod::EWallet => engine::PaymentMethod::EWallet,
        ApiMethod::Other => engine::PaymentMethod::Other,
    }
}

pub async fn record(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<PaymentNew>,
) -> Result<(StatusCode, Json<PaymentCreated>), ServerError> {
    let id = state
        .engine
        .record_payment(engine::RecordPaymentCmd {
            user_id: user.id.clone(),
            invoice_id,
            amount: Money::new(payload.amount_minor),
            payment_date: payload.payment_date,
            method: map_method_to_engine(payload.method),
            bank_account_id: payload.bank_account_id,
            e_wallet_id: payload.e_wallet_id,
            reference: payload.reference,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(PaymentCreated { id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<PaymentsResponse>, ServerError> {
    let payments = state
        .engine
        .payments_for_invoice(&user.id, invoice_id)
        .await?;

    Ok(Json(PaymentsResponse {
        payments: payments
            .into_iter()
            .map(|payment| PaymentView {
                id: payment.id,
                amount_minor: payment.amount.minor(),
                payment_date: payment.payment_date,
                method: map_method(payment.method),
                bank_account_id: payment.bank_account_id,
                e_wallet_id: payment.e_wallet_id,
                reference: payment.reference,
                voided: payment.voided_at.is_some(),
            })
            .collect(),
    }))
}

pub async fn void_payment(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.void_payment(&user.id, id, Utc::now()).await?;

    Ok(StatusCode::OK)
}
