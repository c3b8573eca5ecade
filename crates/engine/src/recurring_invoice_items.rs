//! Template line items for recurring invoices.
//!
//! Unlike invoice lines these carry no computed tax/amount: generation
//! recomputes them for every materialized invoice.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurringInvoiceItem {
    pub id: Uuid,
    pub recurring_invoice_id: Uuid,
    pub product_id: Uuid,
    /// Zero-based display order within the template.
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_rate_bps: i64,
}

impl RecurringInvoiceItem {
    pub fn new(
        recurring_invoice_id: Uuid,
        product_id: Uuid,
        description: String,
        quantity: i64,
        unit_price: Money,
        tax_rate_bps: i64,
    ) -> ResultEngine<Self> {
        if quantity < 1 {
            return Err(EngineError::InvalidAmount(
                "quantity must be >= 1".to_string(),
            ));
        }
        if unit_price.is_negative() {
            return Err(EngineError::InvalidAmount(
                "unit price must not be negative".to_string(),
            ));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            recurring_invoice_id,
            product_id,
            position: 0,
            description,
            quantity,
            unit_price,
            tax_rate_bps,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_invoice_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub recurring_invoice_id: String,
    pub product_id: String,
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub tax_rate_bps: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recurring_invoices::Entity",
        from = "Column::RecurringInvoiceId",
        to = "super::recurring_invoices::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    RecurringInvoices,
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Products,
}

impl Related<super::recurring_invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecurringInvoices.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringInvoiceItem> for ActiveModel {
    fn from(item: &RecurringInvoiceItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            recurring_invoice_id: ActiveValue::Set(item.recurring_invoice_id.to_string()),
            product_id: ActiveValue::Set(item.product_id.to_string()),
            position: ActiveValue::Set(item.position),
            description: ActiveValue::Set(item.description.clone()),
            quantity: ActiveValue::Set(item.quantity),
            unit_price_minor: ActiveValue::Set(item.unit_price.minor()),
            tax_rate_bps: ActiveValue::Set(item.tax_rate_bps),
        }
    }
}

impl TryFrom<Model> for RecurringInvoiceItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid template item id".to_string()))?,
            recurring_invoice_id: Uuid::parse_str(&model.recurring_invoice_id)
                .map_err(|_| EngineError::InvalidId("invalid recurring invoice id".to_string()))?,
            product_id: Uuid::parse_str(&model.product_id)
                .map_err(|_| EngineError::InvalidId("invalid product id".to_string()))?,
            position: model.position,
            description: model.description,
            quantity: model.quantity,
            unit_price: Money::new(model.unit_price_minor),
            tax_rate_bps: model.tax_rate_bps,
        })
    }
}
