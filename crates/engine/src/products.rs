//! Sellable items/services.
//!
//! Products are catalogue entries: invoice lines snapshot their price and
//! tax rate at creation time, so editing a product never rewrites an
//! already-created invoice.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{EngineError, Money};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Product {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Free-form unit label shown on invoice lines ("hour", "pcs", ...).
    pub unit: Option<String>,
    pub price: Money,
    /// Tax rate in basis points (1% = 100).
    pub tax_rate_bps: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn new(
        user_id: String,
        name: String,
        price: Money,
        tax_rate_bps: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            description: None,
            unit: None,
            price,
            tax_rate_bps,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub price_minor: i64,
    pub tax_rate_bps: i64,
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
    #[sea_orm(has_many = "super::invoice_items::Entity")]
    InvoiceItems,
    #[sea_orm(has_many = "super::recurring_invoice_items::Entity")]
    RecurringInvoiceItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Product> for ActiveModel {
    fn from(product: &Product) -> Self {
        Self {
            id: ActiveValue::Set(product.id.to_string()),
            user_id: ActiveValue::Set(product.user_id.clone()),
            name: ActiveValue::Set(product.name.clone()),
            description: ActiveValue::Set(product.description.clone()),
            unit: ActiveValue::Set(product.unit.clone()),
            price_minor: ActiveValue::Set(product.price.minor()),
            tax_rate_bps: ActiveValue::Set(product.tax_rate_bps),
            created_at: ActiveValue::Set(product.created_at),
            updated_at: ActiveValue::Set(product.updated_at),
            deleted_at: ActiveValue::Set(product.deleted_at),
        }
    }
}

impl TryFrom<Model> for Product {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid product id".to_string()))?,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            unit: model.unit,
            price: Money::new(model.price_minor),
            tax_rate_bps: model.tax_rate_bps,
            created_at: model.created_at,
            updated_at: model.updated_at,
            deleted_at: model.deleted_at,
        })
    }
}
