use chrono::{Days, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    EngineError, InvoiceItem, LineInput, Money, NewRecurringCmd, RecurringInvoice,
    RecurringInvoiceItem, ResultEngine, UpdateRecurringCmd,
    invoices::compute_totals,
    recurring_invoice_items, recurring_invoices,
};

use super::{Engine, normalize_optional_text, with_tx};

/// One invoice materialized by [`Engine::generate_due_invoices`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedInvoice {
    pub recurring_invoice_id: Uuid,
    pub invoice_id: Uuid,
    pub number: String,
    pub issue_date: NaiveDate,
    pub total: Money,
    pub currency: crate::Currency,
}

impl Engine {
    /// Resolves template lines against the catalogue, snapshotting price,
    /// tax rate and description onto the template.
    async fn resolve_template_lines(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        recurring_id: Uuid,
        lines: &[LineInput],
    ) -> ResultEngine<Vec<RecurringInvoiceItem>> {
        let mut items = Vec::with_capacity(lines.len());
        for (position, line) in lines.iter().enumerate() {
            let product = self
                .require_product_of_user(db_tx, user_id, line.product_id)
                .await?;
            let description = normalize_optional_text(line.description.as_deref())
                .unwrap_or_else(|| product.name.clone());

            let mut item = RecurringInvoiceItem::new(
                recurring_id,
                line.product_id,
                description,
                line.quantity,
                Money::new(product.price_minor),
                product.tax_rate_bps,
            )?;
            item.position = position as i64;
            items.push(item);
        }
        Ok(items)
    }

    /// Checks that the template would currently produce a valid invoice
    /// (non-empty lines, discount within bounds).
    fn validate_template_amounts(
        items: &[RecurringInvoiceItem],
        discount: Money,
    ) -> ResultEngine<()> {
        let preview: Vec<InvoiceItem> = items
            .iter()
            .map(|item| {
                InvoiceItem::new(
                    Uuid::nil(),
                    item.product_id,
                    item.description.clone(),
                    item.quantity,
                    item.unit_price,
                    item.tax_rate_bps,
                )
            })
            .collect::<ResultEngine<Vec<_>>>()?;
        compute_totals(&preview, discount).map(|_| ())
    }

    /// Creates a recurring invoice template. Generation starts at
    /// `start_date`.
    pub async fn new_recurring(&self, cmd: NewRecurringCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            self.require_client_of_user(&db_tx, &cmd.user_id, cmd.client_id)
                .await?;
            // Fail early: generation needs the profile for the currency.
            self.require_profile(&db_tx, &cmd.user_id).await?;

            let template = RecurringInvoice::new(
                cmd.user_id.clone(),
                cmd.client_id,
                cmd.pattern,
                cmd.start_date,
                cmd.end_date,
                cmd.due_in_days,
                cmd.discount,
                normalize_optional_text(cmd.note.as_deref()),
                Utc::now(),
            )?;
            let recurring_id = template.id;

            let items = self
                .resolve_template_lines(&db_tx, &cmd.user_id, recurring_id, &cmd.items)
                .await?;
            Self::validate_template_amounts(&items, cmd.discount)?;

            let model: recurring_invoices::ActiveModel = (&template).into();
            model.insert(&db_tx).await?;
            for item in &items {
                let item_model: recurring_invoice_items::ActiveModel = item.into();
                item_model.insert(&db_tx).await?;
            }

            Ok(recurring_id)
        })
    }

    /// Reworks a recurring template: schedule fields, note, discount and the
    /// full item list are replaced. `next_invoice_date` only moves when
    /// explicitly given.
    pub async fn update_recurring(&self, cmd: UpdateRecurringCmd) -> ResultEngine<()> {
        if cmd.due_in_days < 0 {
            return Err(EngineError::InvalidAmount(
                "due_in_days must not be negative".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = self
                .require_recurring_of_user(&db_tx, &cmd.user_id, cmd.recurring_id)
                .await?;
            if let Some(end) = cmd.end_date
                && end < model.start_date
            {
                return Err(EngineError::InvalidPattern(
                    "end_date must not precede start_date".to_string(),
                ));
            }
            if let Some(next) = cmd.next_invoice_date
                && next < model.start_date
            {
                return Err(EngineError::InvalidPattern(
                    "next_invoice_date must not precede start_date".to_string(),
                ));
            }

            let items = self
                .resolve_template_lines(&db_tx, &cmd.user_id, cmd.recurring_id, &cmd.items)
                .await?;
            Self::validate_template_amounts(&items, cmd.discount)?;

            recurring_invoice_items::Entity::delete_many()
                .filter(
                    recurring_invoice_items::Column::RecurringInvoiceId
                        .eq(cmd.recurring_id.to_string()),
                )
                .exec(&db_tx)
                .await?;
            for item in &items {
                let item_model: recurring_invoice_items::ActiveModel = item.into();
                item_model.insert(&db_tx).await?;
            }

            let active = recurring_invoices::ActiveModel {
                id: ActiveValue::Set(cmd.recurring_id.to_string()),
                pattern: ActiveValue::Set(cmd.pattern.as_str().to_string()),
                end_date: ActiveValue::Set(cmd.end_date),
                due_in_days: ActiveValue::Set(cmd.due_in_days),
                discount_minor: ActiveValue::Set(cmd.discount.minor()),
                note: ActiveValue::Set(normalize_optional_text(cmd.note.as_deref())),
                next_invoice_date: match cmd.next_invoice_date {
                    Some(next) => ActiveValue::Set(next),
                    None => ActiveValue::NotSet,
                },
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Returns a recurring template with its line items (in display order).
    pub async fn recurring_with_items(
        &self,
        user_id: &str,
        recurring_id: Uuid,
    ) -> ResultEngine<RecurringInvoice> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_recurring_of_user(&db_tx, user_id, recurring_id)
                .await?;
            let mut template = RecurringInvoice::try_from(model)?;

            let item_models: Vec<recurring_invoice_items::Model> =
                recurring_invoice_items::Entity::find()
                    .filter(
                        recurring_invoice_items::Column::RecurringInvoiceId
                            .eq(recurring_id.to_string()),
                    )
                    .order_by_asc(recurring_invoice_items::Column::Position)
                    .all(&db_tx)
                    .await?;
            template.items = item_models
                .into_iter()
                .map(RecurringInvoiceItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(template)
        })
    }

    /// Lists the live recurring templates of a user (inactive included),
    /// oldest first.
    pub async fn list_recurring(&self, user_id: &str) -> ResultEngine<Vec<RecurringInvoice>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            let models: Vec<recurring_invoices::Model> = recurring_invoices::Entity::find()
                .filter(recurring_invoices::Column::UserId.eq(user_id.to_string()))
                .filter(recurring_invoices::Column::DeletedAt.is_null())
                .order_by_asc(recurring_invoices::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            models
                .into_iter()
                .map(RecurringInvoice::try_from)
                .collect()
        })
    }

    /// Pauses or resumes a recurring template.
    pub async fn set_recurring_active(
        &self,
        user_id: &str,
        recurring_id: Uuid,
        is_active: bool,
    ) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_recurring_of_user(&db_tx, user_id, recurring_id)
                .await?;

            let active = recurring_invoices::ActiveModel {
                id: ActiveValue::Set(recurring_id.to_string()),
                is_active: ActiveValue::Set(is_active),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Soft-deletes a recurring template. Already-generated invoices keep
    /// their provenance link.
    pub async fn delete_recurring(&self, user_id: &str, recurring_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_recurring_of_user(&db_tx, user_id, recurring_id)
                .await?;

            let active = recurring_invoices::ActiveModel {
                id: ActiveValue::Set(recurring_id.to_string()),
                is_active: ActiveValue::Set(false),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Materializes every due occurrence of every active template, across
    /// all users, as DRAFT invoices.
    ///
    /// A template two months stale on a MONTHLY pattern yields two invoices
    /// (one per elapsed period). Templates whose schedule ran past their
    /// `end_date` are deactivated. Each template is processed in its own DB
    /// transaction, so one failing template does not roll back the others.
    pub async fn generate_due_invoices(
        &self,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<GeneratedInvoice>> {
        self.generate_due_invoices_inner(None, as_of).await
    }

    /// Same as [`Engine::generate_due_invoices`], restricted to one user.
    pub async fn generate_due_invoices_for_user(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<GeneratedInvoice>> {
        with_tx!(self, |db_tx| self.require_user(&db_tx, user_id).await)?;
        self.generate_due_invoices_inner(Some(user_id), as_of).await
    }

    async fn generate_due_invoices_inner(
        &self,
        user_id: Option<&str>,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<GeneratedInvoice>> {
        let due_ids: Vec<String> = {
            let db_tx = self.database.begin().await?;
            let mut query = recurring_invoices::Entity::find()
                .filter(recurring_invoices::Column::DeletedAt.is_null())
                .filter(recurring_invoices::Column::IsActive.eq(true))
                .filter(recurring_invoices::Column::NextInvoiceDate.lte(as_of))
                .order_by_asc(recurring_invoices::Column::CreatedAt);
            if let Some(user_id) = user_id {
                query =
                    query.filter(recurring_invoices::Column::UserId.eq(user_id.to_string()));
            }
            let models = query.all(&db_tx).await?;
            db_tx.commit().await?;
            models.into_iter().map(|m| m.id).collect()
        };

        let mut generated = Vec::new();
        for raw_id in due_ids {
            let recurring_id = Uuid::parse_str(&raw_id)
                .map_err(|_| EngineError::InvalidId("invalid recurring invoice id".to_string()))?;
            let mut batch = self.generate_for_template(recurring_id, as_of).await?;
            generated.append(&mut batch);
        }
        Ok(generated)
    }

    /// Walks one template forward to `as_of` inside a single transaction.
    async fn generate_for_template(
        &self,
        recurring_id: Uuid,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<GeneratedInvoice>> {
        with_tx!(self, |db_tx| {
            // Re-read inside the transaction; the listing snapshot may be
            // stale.
            let Some(model) = recurring_invoices::Entity::find_by_id(recurring_id.to_string())
                .filter(recurring_invoices::Column::DeletedAt.is_null())
                .filter(recurring_invoices::Column::IsActive.eq(true))
                .one(&db_tx)
                .await?
            else {
                return Ok(Vec::new());
            };
            let template = RecurringInvoice::try_from(model)?;

            let item_models: Vec<recurring_invoice_items::Model> =
                recurring_invoice_items::Entity::find()
                    .filter(
                        recurring_invoice_items::Column::RecurringInvoiceId
                            .eq(recurring_id.to_string()),
                    )
                    .order_by_asc(recurring_invoice_items::Column::Position)
                    .all(&db_tx)
                    .await?;
            let template_items = item_models
                .into_iter()
                .map(RecurringInvoiceItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            // Walk the schedule by occurrence index from the anchor date:
            // occurrences in [next_invoice_date, as_of] (and not past the
            // end date) are materialized, the first one beyond `as_of`
            // becomes the new next_invoice_date.
            let mut generated = Vec::new();
            let mut still_active = true;
            let mut n: u32 = 0;
            let next = loop {
                let occurrence = template.pattern.occurrence(template.start_date, n)?;
                n += 1;
                if occurrence < template.next_invoice_date {
                    continue;
                }
                if occurrence > as_of {
                    break occurrence;
                }
                if let Some(end) = template.end_date
                    && occurrence > end
                {
                    break occurrence;
                }

                let due_date = occurrence
                    .checked_add_days(Days::new(template.due_in_days as u64))
                    .ok_or_else(|| {
                        EngineError::InvalidPattern("due date overflow".to_string())
                    })?;
                let items = template_items
                    .iter()
                    .map(|item| {
                        InvoiceItem::new(
                            Uuid::nil(),
                            item.product_id,
                            item.description.clone(),
                            item.quantity,
                            item.unit_price,
                            item.tax_rate_bps,
                        )
                    })
                    .collect::<ResultEngine<Vec<_>>>()?;

                let invoice = self
                    .insert_draft_invoice(
                        &db_tx,
                        &template.user_id,
                        template.client_id,
                        occurrence,
                        due_date,
                        items,
                        template.discount,
                        template.note.clone(),
                        Some(recurring_id),
                    )
                    .await?;
                generated.push(GeneratedInvoice {
                    recurring_invoice_id: recurring_id,
                    invoice_id: invoice.id,
                    number: invoice.number,
                    issue_date: occurrence,
                    total: invoice.total,
                    currency: invoice.currency,
                });
            };

            if let Some(end) = template.end_date
                && next > end
            {
                still_active = false;
            }

            let active = recurring_invoices::ActiveModel {
                id: ActiveValue::Set(recurring_id.to_string()),
                next_invoice_date: ActiveValue::Set(next),
                is_active: ActiveValue::Set(still_active),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            Ok(generated)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::RecurringPattern;

    #[test]
    fn pattern_roundtrip_through_strings() {
        for pattern in [
            RecurringPattern::Weekly,
            RecurringPattern::Biweekly,
            RecurringPattern::Monthly,
            RecurringPattern::Quarterly,
            RecurringPattern::Semiannually,
            RecurringPattern::Annually,
        ] {
            assert_eq!(
                RecurringPattern::try_from(pattern.as_str()).unwrap(),
                pattern
            );
        }
    }
}
