//! Billing profile and payment-instrument API endpoints

use api_types::profile::{
    BankAccountNew, BankAccountView, EWalletNew, EWalletView, InstrumentCreated,
    InstrumentsResponse, ProfileUpsert, ProfileView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Idr => api_types::Currency::Idr,
    }
}

fn map_currency_to_engine(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Idr => engine::Currency::Idr,
    }
}

pub async fn upsert(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<ProfileUpsert>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .upsert_profile(engine::ProfileUpsertCmd {
            user_id: user.id.clone(),
            company_name: payload.company_name,
            address: payload.address,
            tax_number: payload.tax_number,
            currency: payload.currency.map(map_currency_to_engine),
        })
        .await?;

    Ok(StatusCode::OK)
}

pub async fn get_profile(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<ProfileView>, ServerError> {
    let profile = state.engine.profile(&user.id).await?;

    Ok(Json(ProfileView {
        company_name: profile.company_name,
        address: profile.address,
        tax_number: profile.tax_number,
        currency: map_currency(profile.currency),
    }))
}

pub async fn list_instruments(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<InstrumentsResponse>, ServerError> {
    let (accounts, wallets) = state.engine.list_instruments(&user.id).await?;

    Ok(Json(InstrumentsResponse {
        bank_accounts: accounts
            .into_iter()
            .map(|account| BankAccountView {
                id: account.id,
                bank_name: account.bank_name,
                account_name: account.account_name,
                account_number: account.account_number,
                is_primary: account.is_primary,
                archived: account.archived,
            })
            .collect(),
        e_wallets: wallets
            .into_iter()
            .map(|wallet| EWalletView {
                id: wallet.id,
                provider: wallet.provider,
                account_name: wallet.account_name,
                phone_number: wallet.phone_number,
                is_primary: wallet.is_primary,
                archived: wallet.archived,
            })
            .collect(),
    }))
}

pub async fn bank_account_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BankAccountNew>,
) -> Result<(StatusCode, Json<InstrumentCreated>), ServerError> {
    let id = state
        .engine
        .new_bank_account(engine::NewBankAccountCmd {
            user_id: user.id.clone(),
            bank_name: payload.bank_name,
            account_name: payload.account_name,
            account_number: payload.account_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(InstrumentCreated { id })))
}

pub async fn bank_account_set_primary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.set_primary_bank_account(&user.id, id).await?;

    Ok(StatusCode::OK)
}

pub async fn bank_account_archive(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.archive_bank_account(&user.id, id).await?;

    Ok(StatusCode::OK)
}

pub async fn e_wallet_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EWalletNew>,
) -> Result<(StatusCode, Json<InstrumentCreated>), ServerError> {
    let id = state
        .engine
        .new_e_wallet(engine::NewEWalletCmd {
            user_id: user.id.clone(),
            provider: payload.provider,
            account_name: payload.account_name,
            phone_number: payload.phone_number,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(InstrumentCreated { id })))
}

pub async fn e_wallet_set_primary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.set_primary_e_wallet(&user.id, id).await?;

    Ok(StatusCode::OK)
}

pub async fn e_wallet_archive(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.archive_e_wallet(&user.id, id).await?;

    Ok(StatusCode::OK)
}
