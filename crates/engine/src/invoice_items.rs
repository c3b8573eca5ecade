//! Invoice line items.
//!
//! A line snapshots the product's description, unit price and tax rate at
//! creation time; later product edits never change an existing invoice.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub product_id: Uuid,
    /// Zero-based display order within the invoice.
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub tax_rate_bps: i64,
    /// Tax on this line, rounded half-up at minor-unit precision.
    pub tax: Money,
    /// Pre-tax line amount (`quantity * unit_price`).
    pub amount: Money,
}

impl InvoiceItem {
    /// Computes a line from its inputs.
    ///
    /// `amount = quantity * unit_price` and `tax = amount * tax_rate_bps`,
    /// both checked.
    pub fn new(
        invoice_id: Uuid,
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

        let amount = unit_price
            .checked_mul(quantity)
            .ok_or_else(|| EngineError::InvalidAmount("line amount overflow".to_string()))?;
        let tax = amount.apply_bps(tax_rate_bps)?;

        Ok(Self {
            id: Uuid::new_v4(),
            invoice_id,
            product_id,
            // Stamped from the line's index when the invoice is assembled.
            position: 0,
            description,
            quantity,
            unit_price,
            tax_rate_bps,
            tax,
            amount,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "invoice_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub position: i64,
    pub description: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
    pub tax_rate_bps: i64,
    pub tax_minor: i64,
    pub amount_minor: i64,
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
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Products,
}

impl Related<super::invoices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoices.def()
    }
}

impl Related<super::products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&InvoiceItem> for ActiveModel {
    fn from(item: &InvoiceItem) -> Self {
        Self {
            id: ActiveValue::Set(item.id.to_string()),
            invoice_id: ActiveValue::Set(item.invoice_id.to_string()),
            product_id: ActiveValue::Set(item.product_id.to_string()),
            position: ActiveValue::Set(item.position),
            description: ActiveValue::Set(item.description.clone()),
            quantity: ActiveValue::Set(item.quantity),
            unit_price_minor: ActiveValue::Set(item.unit_price.minor()),
            tax_rate_bps: ActiveValue::Set(item.tax_rate_bps),
            tax_minor: ActiveValue::Set(item.tax.minor()),
            amount_minor: ActiveValue::Set(item.amount.minor()),
        }
    }
}

impl TryFrom<Model> for InvoiceItem {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid invoice item id".to_string()))?,
            invoice_id: Uuid::parse_str(&model.invoice_id)
                .map_err(|_| EngineError::InvalidId("invalid invoice id".to_string()))?,
            product_id: Uuid::parse_str(&model.product_id)
                .map_err(|_| EngineError::InvalidId("invalid product id".to_string()))?,
            position: model.position,
            description: model.description,
            quantity: model.quantity,
            unit_price: Money::new(model.unit_price_minor),
            tax_rate_bps: model.tax_rate_bps,
            tax: Money::new(model.tax_minor),
            amount: Money::new(model.amount_minor),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_amount_and_tax_are_computed() {
        let item = InvoiceItem::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Hosting".to_string(),
            3,
            Money::new(25_50),
            1000,
        )
        .unwrap();

        assert_eq!(item.amount, Money::new(76_50));
        // 10% of 76.50 = 7.65
        assert_eq!(item.tax, Money::new(7_65));
    }

    #[test]
    fn rejects_zero_quantity() {
        assert!(
            InvoiceItem::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "Hosting".to_string(),
                0,
                Money::new(100),
                0,
            )
            .is_err()
        );
    }
}
