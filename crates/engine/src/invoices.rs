//! Invoice primitives.
//!
//! An `Invoice` belongs to a user and a client, owns its line items and
//! payments, and moves through a small lifecycle:
//!
//! ```text
//! DRAFT ──issue──▶ PENDING ──payments──▶ PARTIAL ──▶ PAID
//!   │                 │  ╲                  │
//!   │                 │   ╲──due date──▶ OVERDUE ──▶ PAID
//!   └──▶ CANCELLED ◀──┘ (only while unpaid)
//! ```
//!
//! DRAFT is the only editable status; PAID and CANCELLED are terminal.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Currency, EngineError, Money, ResultEngine, invoice_items::InvoiceItem};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Pending,
    Paid,
    Partial,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Partial => "partial",
            Self::Overdue => "overdue",
            Self::Cancelled => "cancelled",
        }
    }

    /// An open invoice still expects money: payments may be recorded against
    /// it and the overdue sweep considers it.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Partial | Self::Overdue)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl TryFrom<&str> for InvoiceStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "partial" => Ok(Self::Partial),
            "overdue" => Ok(Self::Overdue),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidStatus(format!(
                "invalid invoice status: {other}"
            ))),
        }
    }
}

/// Recomputes the status of an open invoice after its payment set changed.
///
/// `as_of` is the date used for aging (a fully unpaid invoice past its due
/// date is OVERDUE, not PENDING). Callers must only pass open statuses;
/// DRAFT/PAID/CANCELLED never reach reconciliation.
pub fn reconciled_status(
    total: Money,
    paid: Money,
    due_date: NaiveDate,
    as_of: NaiveDate,
) -> InvoiceStatus {
    if paid >= total {
        return InvoiceStatus::Paid;
    }
    if due_date < as_of {
        return InvoiceStatus::Overdue;
    }
    if paid.is_positive() {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Pending
    }
}

/// Formats a per-user invoice number, e.g. `INV-2026-0042`.
pub(crate) fn format_number(year: i32, seq: u64) -> String {
    format!("INV-{year}-{seq:04}")
}

/// Computes `(subtotal, tax, total)` from the line items and an
/// invoice-level discount, enforcing `subtotal + tax - discount = total`.
pub(crate) fn compute_totals(
    items: &[InvoiceItem],
    discount: Money,
) -> ResultEngine<(Money, Money, Money)> {
    if items.is_empty() {
        return Err(EngineError::InvalidAmount(
            "invoice must have at least one item".to_string(),
        ));
    }
    if discount.is_negative() {
        return Err(EngineError::InvalidAmount(
            "discount must not be negative".to_string(),
        ));
    }

    let mut subtotal = Money::ZERO;
    let mut tax = Money::ZERO;
    for item in items {
        subtotal = subtotal
            .checked_add(item.amount)
            .ok_or_else(|| EngineError::InvalidAmount("subtotal overflow".to_string()))?;
        tax = tax
            .checked_add(item.tax)
            .ok_or_else(|| EngineError::InvalidAmount("tax overflow".to_string()))?;
    }
    let gross = subtotal
        .checked_add(tax)
        .ok_or_else(|| EngineError::InvalidAmount("total overflow".to_string()))?;
    if discount > gross {
        return Err(EngineError::InvalidAmount(
            "discount exceeds invoice amount".to_string(),
        ));
    }

    Ok((subtotal, tax, gross - discount))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invoice {
    pub id: Uuid,
    pub user_id: String,
    pub client_id: Uuid,
    /// Provenance: set when this invoice was generated from a recurring
    /// template.
    pub recurring_invoice_id: Option<Uuid>,
    pub number: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: Currency,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub items: Vec<InvoiceItem>,
}

impl Invoice {
    /// Builds a DRAFT invoice from already-computed items, checking the
    /// monetary invariant `subtotal + tax - discount = total`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        client_id: Uuid,
        number: String,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        items: Vec<InvoiceItem>,
        discount: Money,
        currency: Currency,
        note: Option<String>,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        if due_date < issue_date {
            return Err(EngineError::InvalidAmount(
                "due_date must not precede issue_date".to_string(),
            ));
        }
        let (subtotal, tax, total) = compute_totals(&items, discount)?;

        // The invoice owns its lines: re-point them at the freshly minted id
        // and stamp their display order.
        let id = Uuid::new_v4();
        let mut items = items;
        for (position, item) in items.iter_mut().enumerate() {
            item.invoice_id = id;
            item.position = position as i64;
        }

        Ok(Self {
            id,
            user_id,
            client_id,
            recurring_invoice_id: None,
            number,
            status: InvoiceStatus::Draft,
            issue_date,
            due_date,
            subtotal,
            tax,
            discount,
            total,
            currency,
            note,
            created_at,
            updated_at: created_at,
            deleted_at: None,
            items,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub client_id: String,
    pub recurring_invoice_id: Option<String>,
    pub number: String,
    pub status: String,
    pub issue_date: Date,
    pub due_date: Date,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub total_minor: i64,
    pub currency: String,
    pub note: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::clients::Entity",
        from = "Column::ClientId",
        to = "super::clients::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Clients,
    #[sea_orm(
        belongs_to = "super::recurring_invoices::Entity",
        from = "Column::RecurringInvoiceId",
        to = "super::recurring_invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    RecurringInvoices,
    #[sea_orm(has_many = "super::invoice_items::Entity")]
    InvoiceItems,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::invoice_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InvoiceItems.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::clients::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clients.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::recurring_invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringInvoices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Invoice> for ActiveModel {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: ActiveValue::Set(invoice.id.to_string()),
            user_id: ActiveValue::Set(invoice.user_id.clone()),
            client_id: ActiveValue::Set(invoice.client_id.to_string()),
            recurring_invoice_id: ActiveValue::Set(
                invoice.recurring_invoice_id.map(|id| id.to_string()),
            ),
            number: ActiveValue::Set(invoice.number.clone()),
            status: ActiveValue::Set(invoice.status.as_str().to_string()),
            issue_date: ActiveValue::Set(invoice.issue_date),
            due_date: ActiveValue::Set(invoice.due_date),
            subtotal_minor: ActiveValue::Set(invoice.subtotal.minor()),
            tax_minor: ActiveValue::Set(invoice.tax.minor()),
            discount_minor: ActiveValue::Set(invoice.discount.minor()),
            total_minor: ActiveValue::Set(invoice.total.minor()),
            currency: ActiveValue::Set(invoice.currency.code().to_string()),
            note: ActiveValue::Set(invoice.note.clone()),
            created_at: ActiveValue::Set(invoice.created_at),
            updated_at: ActiveValue::Set(invoice.updated_at),
            deleted_at: ActiveValue::Set(invoice.deleted_at),
        }
    }
}

impl TryFrom<Model> for Invoice {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid invoice id".to_string()))?,
            user_id: model.user_id,
            client_id: Uuid::parse_str(&model.client_id)
                .map_err(|_| EngineError::InvalidId("invalid client id".to_string()))?,
            recurring_invoice_id: model
                .recurring_invoice_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
            number: model.number,
            status: InvoiceStatus::try_from(model.status.as_str())?,
            issue_date: model.issue_date,
            due_date: model.due_date,
            subtotal: Money::new(model.subtotal_minor),
            tax: Money::new(model.tax_minor),
            discount: Money::new(model.discount_minor),
            total: Money::new(model.total_minor),
            currency: Currency::try_from(model.currency.as_str())?,
            note: model.note,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
            items: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn reconciled_status_covers_all_cases() {
        let total = Money::new(10_000);
        let due = date(2026, 3, 15);

        // Nothing paid, not yet due.
        assert_eq!(
            reconciled_status(total, Money::ZERO, due, date(2026, 3, 15)),
            InvoiceStatus::Pending
        );
        // Nothing paid, past due.
        assert_eq!(
            reconciled_status(total, Money::ZERO, due, date(2026, 3, 16)),
            InvoiceStatus::Overdue
        );
        // Partially paid, not yet due.
        assert_eq!(
            reconciled_status(total, Money::new(4_000), due, date(2026, 3, 10)),
            InvoiceStatus::Partial
        );
        // Partially paid but late stays overdue.
        assert_eq!(
            reconciled_status(total, Money::new(4_000), due, date(2026, 4, 1)),
            InvoiceStatus::Overdue
        );
        // Fully paid wins regardless of dates.
        assert_eq!(
            reconciled_status(total, total, due, date(2026, 4, 1)),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn number_format_pads_sequence() {
        assert_eq!(format_number(2026, 1), "INV-2026-0001");
        assert_eq!(format_number(2026, 1234), "INV-2026-1234");
        assert_eq!(format_number(2026, 12345), "INV-2026-12345");
    }

    #[test]
    fn new_invoice_totals_reconcile() {
        let item = InvoiceItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Consulting".to_string(),
            2,
            Money::new(50_00),
            2100,
        )
        .unwrap();
        let invoice = Invoice::new(
            "user".to_string(),
            Uuid::new_v4(),
            "INV-2026-0001".to_string(),
            date(2026, 1, 10),
            date(2026, 2, 10),
            vec![item],
            Money::new(5_00),
            Currency::Eur,
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(invoice.subtotal, Money::new(100_00));
        assert_eq!(invoice.tax, Money::new(21_00));
        assert_eq!(invoice.discount, Money::new(5_00));
        assert_eq!(invoice.total, Money::new(116_00));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(
            invoice.subtotal + invoice.tax - invoice.discount,
            invoice.total
        );
    }

    #[test]
    fn new_invoice_rejects_bad_input() {
        let item = InvoiceItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Consulting".to_string(),
            1,
            Money::new(10_00),
            0,
        )
        .unwrap();

        // No items.
        assert!(
            Invoice::new(
                "user".to_string(),
                Uuid::new_v4(),
                "INV-2026-0001".to_string(),
                date(2026, 1, 10),
                date(2026, 2, 10),
                Vec::new(),
                Money::ZERO,
                Currency::Eur,
                None,
                Utc::now(),
            )
            .is_err()
        );
        // Due before issue.
        assert!(
            Invoice::new(
                "user".to_string(),
                Uuid::new_v4(),
                "INV-2026-0001".to_string(),
                date(2026, 1, 10),
                date(2026, 1, 9),
                vec![item.clone()],
                Money::ZERO,
                Currency::Eur,
                None,
                Utc::now(),
            )
            .is_err()
        );
        // Discount larger than the invoice.
        assert!(
            Invoice::new(
                "user".to_string(),
                Uuid::new_v4(),
                "INV-2026-0001".to_string(),
                date(2026, 1, 10),
                date(2026, 2, 10),
                vec![item],
                Money::new(99_99),
                Currency::Eur,
                None,
                Utc::now(),
            )
            .is_err()
        );
    }
}
