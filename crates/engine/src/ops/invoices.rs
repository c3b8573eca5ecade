use base64::Engine as _;
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Statement, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    EngineError, Invoice, InvoiceItem, InvoiceStatus, LineInput, Money, NewInvoiceCmd,
    ResultEngine, UpdateInvoiceCmd,
    invoices::{self, compute_totals, format_number},
    invoice_items,
};

use super::{Engine, access::parse_account_currency, normalize_optional_text, with_tx};

/// Filters for listing invoices.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both on the
/// issue date.
#[derive(Clone, Debug, Default)]
pub struct InvoiceListFilter {
    /// If present, acts as an allow-list of statuses to return.
    pub statuses: Option<Vec<InvoiceStatus>>,
    pub client_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn validate_list_filter(filter: &InvoiceListFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidAmount(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.statuses.as_ref().is_some_and(|s| s.is_empty()) {
        return Err(EngineError::InvalidAmount(
            "statuses must not be empty".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct InvoicesCursor {
    issue_date: NaiveDate,
    invoice_id: String,
}

impl InvoicesCursor {
    fn encode(&self) -> ResultEngine<String> {
        let bytes = serde_json::to_vec(self)
            .map_err(|_| EngineError::InvalidCursor("invalid invoices cursor".to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn decode(input: &str) -> ResultEngine<Self> {
        let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(input.as_bytes())
            .map_err(|_| EngineError::InvalidCursor("invalid invoices cursor".to_string()))?;
        serde_json::from_slice::<Self>(&bytes)
            .map_err(|_| EngineError::InvalidCursor("invalid invoices cursor".to_string()))
    }
}

impl Engine {
    /// Resolves requested lines against the user's catalogue, snapshotting
    /// price, tax rate and description.
    pub(super) async fn resolve_lines(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        invoice_id: Uuid,
        lines: &[LineInput],
    ) -> ResultEngine<Vec<InvoiceItem>> {
        let mut items = Vec::with_capacity(lines.len());
        for (position, line) in lines.iter().enumerate() {
            let product = self
                .require_product_of_user(db_tx, user_id, line.product_id)
                .await?;
            let description = normalize_optional_text(line.description.as_deref())
                .unwrap_or_else(|| product.name.clone());

            let mut item = InvoiceItem::new(
                invoice_id,
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

    /// Sum of non-voided payments recorded against an invoice.
    pub(super) async fn paid_total(
        &self,
        db_tx: &DatabaseTransaction,
        invoice_id: Uuid,
    ) -> ResultEngine<Money> {
        let backend = self.database.get_database_backend();
        let stmt = Statement::from_sql_and_values(
            backend,
            "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
             FROM payments \
             WHERE invoice_id = ? AND voided_at IS NULL",
            vec![invoice_id.to_string().into()],
        );
        let row = db_tx.query_one(stmt).await?;
        Ok(Money::new(
            row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0),
        ))
    }

    /// Allocates the next per-user invoice number for the issue year.
    ///
    /// Counts every row the user ever got (soft-deleted included), so
    /// numbers are never reused.
    async fn allocate_number(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        year: i32,
    ) -> ResultEngine<String> {
        let prefix = format!("INV-{year}-%");
        let taken = invoices::Entity::find()
            .filter(invoices::Column::UserId.eq(user_id.to_string()))
            .filter(invoices::Column::Number.like(prefix.as_str()))
            .count(db_tx)
            .await?;
        Ok(format_number(year, taken + 1))
    }

    /// Inserts a DRAFT invoice from already-resolved items inside an
    /// already-open transaction.
    ///
    /// Shared between the public `new_invoice` (items resolved from the
    /// catalogue) and recurring generation (items snapshotted from the
    /// template, which passes its id as provenance).
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn insert_draft_invoice(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        client_id: Uuid,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        items: Vec<InvoiceItem>,
        discount: Money,
        note: Option<String>,
        recurring_invoice_id: Option<Uuid>,
    ) -> ResultEngine<Invoice> {
        self.require_client_of_user(db_tx, user_id, client_id).await?;
        let profile = self.require_profile(db_tx, user_id).await?;
        let currency = parse_account_currency(&profile.currency)?;

        let number = self.allocate_number(db_tx, user_id, issue_date.year()).await?;

        let mut invoice = Invoice::new(
            user_id.to_string(),
            client_id,
            number,
            issue_date,
            due_date,
            items,
            discount,
            currency,
            normalize_optional_text(note.as_deref()),
            Utc::now(),
        )?;
        invoice.recurring_invoice_id = recurring_invoice_id;

        let model: invoices::ActiveModel = (&invoice).into();
        model.insert(db_tx).await?;
        for item in &invoice.items {
            let item_model: invoice_items::ActiveModel = item.into();
            item_model.insert(db_tx).await?;
        }

        Ok(invoice)
    }

    /// Creates a DRAFT invoice from catalogue lines.
    pub async fn new_invoice(&self, cmd: NewInvoiceCmd) -> ResultEngine<Uuid> {
        with_tx!(self, |db_tx| {
            let items = self
                .resolve_lines(&db_tx, &cmd.user_id, Uuid::nil(), &cmd.items)
                .await?;
            let invoice = self
                .insert_draft_invoice(
                    &db_tx,
                    &cmd.user_id,
                    cmd.client_id,
                    cmd.issue_date,
                    cmd.due_date,
                    items,
                    cmd.discount,
                    cmd.note.clone(),
                    None,
                )
                .await?;
            Ok(invoice.id)
        })
    }

    /// Returns an invoice with its line items (in display order).
    pub async fn invoice_with_items(&self, user_id: &str, invoice_id: Uuid) -> ResultEngine<Invoice> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;
            let mut invoice = Invoice::try_from(model)?;

            let item_models: Vec<invoice_items::Model> = invoice_items::Entity::find()
                .filter(invoice_items::Column::InvoiceId.eq(invoice_id.to_string()))
                .order_by_asc(invoice_items::Column::Position)
                .all(&db_tx)
                .await?;
            invoice.items = item_models
                .into_iter()
                .map(InvoiceItem::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;

            Ok(invoice)
        })
    }

    /// Lists invoices without their items (newest issue date first).
    pub async fn list_invoices(
        &self,
        user_id: &str,
        limit: u64,
        filter: &InvoiceListFilter,
    ) -> ResultEngine<Vec<Invoice>> {
        let (items, _next) = self
            .list_invoices_page(user_id, limit, None, filter)
            .await?;
        Ok(items)
    }

    /// Lists invoices with cursor-based pagination.
    ///
    /// Pagination is newest → older by `(issue_date DESC, id DESC)`; the
    /// returned cursor is opaque.
    pub async fn list_invoices_page(
        &self,
        user_id: &str,
        limit: u64,
        cursor: Option<&str>,
        filter: &InvoiceListFilter,
    ) -> ResultEngine<(Vec<Invoice>, Option<String>)> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            validate_list_filter(filter)?;

            let limit_plus_one = limit.saturating_add(1);
            let mut query = invoices::Entity::find()
                .filter(invoices::Column::UserId.eq(user_id.to_string()))
                .filter(invoices::Column::DeletedAt.is_null())
                .order_by_desc(invoices::Column::IssueDate)
                .order_by_desc(invoices::Column::Id)
                .limit(limit_plus_one);

            if let Some(cursor) = cursor {
                let cursor = InvoicesCursor::decode(cursor)?;
                query = query.filter(
                    Condition::any()
                        .add(invoices::Column::IssueDate.lt(cursor.issue_date))
                        .add(
                            Condition::all()
                                .add(invoices::Column::IssueDate.eq(cursor.issue_date))
                                .add(invoices::Column::Id.lt(cursor.invoice_id)),
                        ),
                );
            }
            if let Some(statuses) = &filter.statuses {
                let statuses: Vec<String> =
                    statuses.iter().map(|s| s.as_str().to_string()).collect();
                query = query.filter(invoices::Column::Status.is_in(statuses));
            }
            if let Some(client_id) = filter.client_id {
                query = query.filter(invoices::Column::ClientId.eq(client_id.to_string()));
            }
            if let Some(from) = filter.from {
                query = query.filter(invoices::Column::IssueDate.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(invoices::Column::IssueDate.lt(to));
            }

            let rows: Vec<invoices::Model> = query.all(&db_tx).await?;
            let has_more = rows.len() > limit as usize;

            let mut out: Vec<Invoice> = Vec::with_capacity(rows.len().min(limit as usize));
            for model in rows.into_iter().take(limit as usize) {
                out.push(Invoice::try_from(model)?);
            }

            let next_cursor = out.last().map(|invoice| InvoicesCursor {
                issue_date: invoice.issue_date,
                invoice_id: invoice.id.to_string(),
            });
            let next_cursor = if has_more {
                next_cursor.map(|c| c.encode()).transpose()?
            } else {
                None
            };

            Ok((out, next_cursor))
        })
    }

    /// Reworks a DRAFT invoice: dates, note, discount and the full item list
    /// are replaced and all totals recomputed.
    pub async fn update_invoice(&self, cmd: UpdateInvoiceCmd) -> ResultEngine<()> {
        if cmd.due_date < cmd.issue_date {
            return Err(EngineError::InvalidAmount(
                "due_date must not precede issue_date".to_string(),
            ));
        }
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice_of_user(&db_tx, &cmd.user_id, cmd.invoice_id)
                .await?;
            let status = InvoiceStatus::try_from(model.status.as_str())?;
            if status != InvoiceStatus::Draft {
                return Err(EngineError::InvalidStatus(
                    "only draft invoices can be edited".to_string(),
                ));
            }

            let items = self
                .resolve_lines(&db_tx, &cmd.user_id, cmd.invoice_id, &cmd.items)
                .await?;
            let (subtotal, tax, total) = compute_totals(&items, cmd.discount)?;

            invoice_items::Entity::delete_many()
                .filter(invoice_items::Column::InvoiceId.eq(cmd.invoice_id.to_string()))
                .exec(&db_tx)
                .await?;
            for item in &items {
                let item_model: invoice_items::ActiveModel = item.into();
                item_model.insert(&db_tx).await?;
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(cmd.invoice_id.to_string()),
                issue_date: ActiveValue::Set(cmd.issue_date),
                due_date: ActiveValue::Set(cmd.due_date),
                subtotal_minor: ActiveValue::Set(subtotal.minor()),
                tax_minor: ActiveValue::Set(tax.minor()),
                discount_minor: ActiveValue::Set(cmd.discount.minor()),
                total_minor: ActiveValue::Set(total.minor()),
                note: ActiveValue::Set(normalize_optional_text(cmd.note.as_deref())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Issues a DRAFT invoice: it becomes PENDING and stops being editable.
    pub async fn issue_invoice(&self, user_id: &str, invoice_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;
            let status = InvoiceStatus::try_from(model.status.as_str())?;
            if status != InvoiceStatus::Draft {
                return Err(EngineError::InvalidStatus(
                    "only draft invoices can be issued".to_string(),
                ));
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(invoice_id.to_string()),
                status: ActiveValue::Set(InvoiceStatus::Pending.as_str().to_string()),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Cancels an invoice.
    ///
    /// Allowed for DRAFT, and for PENDING/OVERDUE invoices with no effective
    /// payments. Anything partially or fully paid must stay on the books.
    pub async fn cancel_invoice(&self, user_id: &str, invoice_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;
            let status = InvoiceStatus::try_from(model.status.as_str())?;

            let cancellable = match status {
                InvoiceStatus::Draft => true,
                InvoiceStatus::Pending | InvoiceStatus::Overdue => {
                    self.paid_total(&db_tx, invoice_id).await?.is_zero()
                }
                InvoiceStatus::Partial | InvoiceStatus::Paid | InvoiceStatus::Cancelled => false,
            };
            if !cancellable {
                return Err(EngineError::InvalidStatus(format!(
                    "cannot cancel a {} invoice",
                    status.as_str()
                )));
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(invoice_id.to_string()),
                status: ActiveValue::Set(InvoiceStatus::Cancelled.as_str().to_string()),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Rolls every PENDING/PARTIAL invoice past its due date to OVERDUE,
    /// across all users. Returns the affected invoice ids.
    pub async fn sweep_overdue(&self, as_of: NaiveDate) -> ResultEngine<Vec<Uuid>> {
        with_tx!(self, |db_tx| {
            self.sweep_overdue_tx(&db_tx, None, as_of).await
        })
    }

    /// Same as [`Engine::sweep_overdue`], restricted to one user.
    pub async fn sweep_overdue_for_user(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<Uuid>> {
        with_tx!(self, |db_tx| {
            self.require_user(&db_tx, user_id).await?;
            self.sweep_overdue_tx(&db_tx, Some(user_id), as_of).await
        })
    }

    async fn sweep_overdue_tx(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: Option<&str>,
        as_of: NaiveDate,
    ) -> ResultEngine<Vec<Uuid>> {
        let mut query = invoices::Entity::find()
            .filter(invoices::Column::DeletedAt.is_null())
            .filter(invoices::Column::Status.is_in([
                InvoiceStatus::Pending.as_str(),
                InvoiceStatus::Partial.as_str(),
            ]))
            .filter(invoices::Column::DueDate.lt(as_of));
        if let Some(user_id) = user_id {
            query = query.filter(invoices::Column::UserId.eq(user_id.to_string()));
        }

        let rows: Vec<invoices::Model> = query.all(db_tx).await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = rows.iter().map(|m| m.id.clone()).collect();
        invoices::Entity::update_many()
            .col_expr(
                invoices::Column::Status,
                Expr::value(InvoiceStatus::Overdue.as_str()),
            )
            .col_expr(invoices::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(invoices::Column::Id.is_in(ids.clone()))
            .exec(db_tx)
            .await?;

        ids.iter()
            .map(|raw| {
                Uuid::parse_str(raw)
                    .map_err(|_| EngineError::InvalidId("invalid invoice id".to_string()))
            })
            .collect()
    }

    /// Soft-deletes an invoice. Only DRAFT and CANCELLED invoices can go;
    /// everything else is part of the books.
    pub async fn delete_invoice(&self, user_id: &str, invoice_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_invoice_of_user(&db_tx, user_id, invoice_id)
                .await?;
            let status = InvoiceStatus::try_from(model.status.as_str())?;
            if !matches!(status, InvoiceStatus::Draft | InvoiceStatus::Cancelled) {
                return Err(EngineError::InvalidStatus(format!(
                    "cannot delete a {} invoice",
                    status.as_str()
                )));
            }

            let active = invoices::ActiveModel {
                id: ActiveValue::Set(invoice_id.to_string()),
                deleted_at: ActiveValue::Set(Some(Utc::now())),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })
    }
}
