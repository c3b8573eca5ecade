//! Payments applied against invoices.
//!
//! Corrections are voids, never row deletions: a voided payment keeps its
//! row (with `voided_at`/`voided_by`) and stops counting toward the
//! invoice's paid total.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    EWallet,
    Other,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::BankTransfer => "bank_transfer",
            Self::EWallet => "e_wallet",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "cash" => Ok(Self::Cash),
            "bank_transfer" => Ok(Self::BankTransfer),
            "e_wallet" => Ok(Self::EWallet),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

/// Checks the method/instrument pairing the schema leaves open: a bank
/// transfer references exactly a bank account, an e-wallet payment exactly
/// an e-wallet, and cash/other neither.
pub fn validate_instrument_pairing(
    method: PaymentMethod,
    bank_account_id: Option<Uuid>,
    e_wallet_id: Option<Uuid>,
) -> ResultEngine<()> {
    let expectation = match method {
        PaymentMethod::BankTransfer => (true, false),
        PaymentMethod::EWallet => (false, true),
        PaymentMethod::Cash | PaymentMethod::Other => (false, false),
    };
    if (bank_account_id.is_some(), e_wallet_id.is_some()) != expectation {
        return Err(EngineError::InvalidAmount(format!(
            "payment method {} does not match the referenced instrument",
            method.as_str()
        )));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub bank_account_id: Option<Uuid>,
    pub e_wallet_id: Option<Uuid>,
    pub reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<String>,
}

impl Payment {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_id: Uuid,
        amount: Money,
        payment_date: NaiveDate,
        method: PaymentMethod,
        bank_account_id: Option<Uuid>,
        e_wallet_id: Option<Uuid>,
        reference: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "payment amount must be > 0".to_string(),
            ));
        }
        validate_instrument_pairing(method, bank_account_id, e_wallet_id)?;

        Ok(Self {
            id: Uuid::new_v4(),
            invoice_id,
            amount,
            payment_date,
            method,
            bank_account_id,
            e_wallet_id,
            reference,
            created_at,
            voided_at: None,
            voided_by: None,
        })
    }

    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invoice_id: String,
    pub amount_minor: i64,
    pub payment_date: Date,
    pub method: String,
    pub bank_account_id: Option<String>,
    pub e_wallet_id: Option<String>,
    pub reference: Option<String>,
    pub created_at: DateTimeUtc,
    pub voided_at: Option<DateTimeUtc>,
    pub voided_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoices::Entity",
        from = "Column::InvoiceId",
        to = "super::invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Invoices,
    #[sea_orm(
        belongs_to = "super::bank_accounts::Entity",
        from = "Column::BankAccountId",
        to = "super::bank_accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    BankAccounts,
    #[sea_orm(
        belongs_to = "super::e_wallets::Entity",
        from = "Column::EWalletId",
        to = "super::e_wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    EWallets,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::bank_accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankAccounts.def()
    }
}

impl Related<super::e_wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EWallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Payment> for ActiveModel {
    fn from(payment: &Payment) -> Self {
        Self {
            id: ActiveValue::Set(payment.id.to_string()),
            invoice_id: ActiveValue::Set(payment.invoice_id.to_string()),
            amount_minor: ActiveValue::Set(payment.amount.minor()),
            payment_date: ActiveValue::Set(payment.payment_date),
            method: ActiveValue::Set(payment.method.as_str().to_string()),
            bank_account_id: ActiveValue::Set(payment.bank_account_id.map(|id| id.to_string())),
            e_wallet_id: ActiveValue::Set(payment.e_wallet_id.map(|id| id.to_string())),
            reference: ActiveValue::Set(payment.reference.clone()),
            created_at: ActiveValue::Set(payment.created_at),
            voided_at: ActiveValue::Set(payment.voided_at),
            voided_by: ActiveValue::Set(payment.voided_by.clone()),
        }
    }
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid payment id".to_string()))?,
            invoice_id: Uuid::parse_str(&model.invoice_id)
                .map_err(|_| EngineError::InvalidId("invalid invoice id".to_string()))?,
            amount: Money::new(model.amount_minor),
            payment_date: model.payment_date,
            method: PaymentMethod::try_from(model.method.as_str())?,
            bank_account_id: model
                .bank_account_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            e_wallet_id: model
                .e_wallet_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            reference: model.reference,
            created_at: model.created_at,
            voided_at: model.voided_at,
            voided_by: model.voided_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_matches_method() {
        let bank = Some(Uuid::new_v4());
        let wallet = Some(Uuid::new_v4());

        assert!(validate_instrument_pairing(PaymentMethod::BankTransfer, bank, None).is_ok());
        assert!(validate_instrument_pairing(PaymentMethod::EWallet, None, wallet).is_ok());
        assert!(validate_instrument_pairing(PaymentMethod::Cash, None, None).is_ok());
        assert!(validate_instrument_pairing(PaymentMethod::Other, None, None).is_ok());

        assert!(validate_instrument_pairing(PaymentMethod::BankTransfer, None, None).is_err());
        assert!(validate_instrument_pairing(PaymentMethod::BankTransfer, bank, wallet).is_err());
        assert!(validate_instrument_pairing(PaymentMethod::EWallet, bank, None).is_err());
        assert!(validate_instrument_pairing(PaymentMethod::Cash, None, wallet).is_err());
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let res = Payment::new(
            Uuid::new_v4(),
            Money::ZERO,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            PaymentMethod::Cash,
            None,
            None,
            None,
            Utc::now(),
        );
        assert!(res.is_err());
    }
}
