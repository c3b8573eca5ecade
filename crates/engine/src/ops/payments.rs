use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, InvoiceStatus, Money, Payment, PaymentMethod, RecordPaymentCmd, ResultEngine,
    invoices::{self, reconciled_status},
    payments,
};

use super::{Engine, normalize_optional_text, with_tx};

impl Engine {
    /// Records a payment against an open invoice and reconciles its status
    /// in the same transaction.
    ///
    /// Overpayment is rejected: the amount must not exceed what is still
    /// outstanding. The referenced instrument must match the method and
    /// belong to the invoice owner's profile.
    pub async fn record_payment(&self, cmd: RecordPaymentCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let invoice_model = self
                .require_invoice_of_user(&db_tx, &cmd.user_id, cmd.invoice_id)
                .await?;
            let status = InvoiceStatus::try_from(invoice_model.status.as_str())?;
            if !status.is_open() {
                return Err(EngineError::InvalidStatus(format!(
                    "cannot record a payment against a {} invoice",
                    status.as_str()
                )));
            }

            match cmd.method {
                PaymentMethod::BankTransfer => {
                    if let Some(account_id) = cmd.bank_account_id {
                        self.require_bank_account_of_user(&db_tx, &cmd.user_id, account_id)
                            .await?;
                    }
                }
                PaymentMethod::EWallet => {
                    if let Some(wallet_id) = cmd.e_wallet_id {
                        self.require_e_wallet_of_user(&db_tx, &cmd.user_id, wallet_id)
                            .await?;
                    }
                }
                PaymentMethod::Cash | PaymentMethod::Other => {}
            }

            let total = Money::new(invoice_model.total_minor);
            let paid = self.paid_total(&db_tx, cmd.invoice_id).await?;
            let outstanding = total
                .checked_sub(paid)
                .ok_or_else(|| EngineError::InvalidAmount("amount overflow".to_string()))?;
            if cmd.amount > outstanding {
                return Err(EngineError::InvalidAmount(format!(
                    "payment exceeds outstanding amount ({} minor units left)",
                    outstanding.minor()
                )));
            }

            let payment = Payment::new(
                cmd.invoice_id,
                cmd.amount,
                cmd.payment_date,
                cmd.method,
                cmd.bank_account_id,
                cmd.e_wallet_id,
                normalize_optional_text(cmd.reference.as_deref()),
                Utc::now(),
            )?;
            let payment_id = payment.id;
            let model: payments::ActiveModel = (&payment).into();
            model.insert(&db_tx).await?;

            let new_paid = paid
                .checked_add(cmd.amount)
                .ok_or_else(|| EngineError::InvalidAmount("amount overflow".to_string()))?;
            let new_status = reconciled_status(
                total,
                new_paid,
                invoice_model.due_date,
                cmd.payment_date,
            );
            if new_status != status {
                let active = invoices::ActiveModel {
                    id: ActiveValue::Set(cmd.invoice_id.to_string()),
                    status: ActiveValue::Set(new_status.as_str().to_string()),
                    updated_at: ActiveValue::Set(Utc::now()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }

            Ok(payment_id)
        })
    }

    /// Lists the payments recorded against an invoice (voided ones
    /// included), oldest first.
    pub async fn payments_for_invoice(
        &self,
        user_id: &str,
        invoice_id: Uuid,
    ) -> ResultEngine<Vec<Payment>> {
        with_tx!(self, |db_tx| {
            self.require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;

            let models: Vec<payments::Model> = payments::Entity::find()
                .filter(payments::Column::InvoiceId.eq(invoice_id.to_string()))
                .order_by_asc(payments::Column::PaymentDate)
                .order_by_asc(payments::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            models.into_iter().map(Payment::try_from).collect()
        })
    }

    /// Voids a payment (soft delete).
    ///
    /// This keeps the row for the audit trail, removes it from the paid
    /// total and reconciles the invoice status. A PAID invoice drops back to
    /// PARTIAL/PENDING/OVERDUE as dictated by what is still covered.
    pub async fn void_payment(
        &self,
        user_id: &str,
        payment_id: Uuid,
        voided_at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let payment_model = payments::Entity::find_by_id(payment_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("payment not exists".to_string()))?;
            if payment_model.voided_at.is_some() {
                return Err(EngineError::InvalidStatus(
                    "payment already voided".to_string(),
                ));
            }

            let invoice_id = Uuid::parse_str(&payment_model.invoice_id)
                .map_err(|_| EngineError::InvalidId("invalid invoice id".to_string()))?;
            let invoice_model = self
                .require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;

            let active = payments::ActiveModel {
                id: ActiveValue::Set(payment_id.to_string()),
                voided_at: ActiveValue::Set(Some(voided_at)),
                voided_by: ActiveValue::Set(Some(user_id.to_string())),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            let status = InvoiceStatus::try_from(invoice_model.status.as_str())?;
            if status.is_open() || status == InvoiceStatus::Paid {
                let total = Money::new(invoice_model.total_minor);
                let paid = self.paid_total(&db_tx, invoice_id).await?;
                let new_status = reconciled_status(
                    total,
                    paid,
                    invoice_model.due_date,
                    voided_at.date_naive(),
                );
                if new_status != status {
                    let invoice_active = invoices::ActiveModel {
                        id: ActiveValue::Set(invoice_id.to_string()),
                        status: ActiveValue::Set(new_status.as_str().to_string()),
                        updated_at: ActiveValue::Set(Utc::now()),
                        ..Default::default()
                    };
                    invoice_active.update(&db_tx).await?;
                }
            }

            Ok(())
        })
    }
}
