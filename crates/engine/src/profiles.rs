//! Billing identity of a user.
//!
//! One-to-one with `users`; the profile carries the business details printed
//! on invoices and owns the payment-receiving instruments. It also fixes the
//! account currency all monetary values are denominated in.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: String,
    pub company_name: String,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(
        user_id: String,
        company_name: String,
        currency: Currency,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            company_name,
            address: None,
            tax_number: None,
            currency,
            created_at,
            updated_at: created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub company_name: String,
    pub address: Option<String>,
    pub tax_number: Option<String>,
    pub currency: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
    #[sea_orm(has_many = "super::bank_accounts::Entity")]
    BankAccounts,
    #[sea_orm(has_many = "super::e_wallets::Entity")]
    EWallets,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
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

impl From<&Profile> for ActiveModel {
    fn from(profile: &Profile) -> Self {
        Self {
            id: ActiveValue::Set(profile.id.to_string()),
            user_id: ActiveValue::Set(profile.user_id.clone()),
            company_name: ActiveValue::Set(profile.company_name.clone()),
            address: ActiveValue::Set(profile.address.clone()),
            tax_number: ActiveValue::Set(profile.tax_number.clone()),
            currency: ActiveValue::Set(profile.currency.code().to_string()),
            created_at: ActiveValue::Set(profile.created_at),
            updated_at: ActiveValue::Set(profile.updated_at),
        }
    }
}

impl TryFrom<Model> for Profile {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?,
            user_id: model.user_id,
            company_name: model.company_name,
            address: model.address,
            tax_number: model.tax_number,
            currency: Currency::try_from(model.currency.as_str())?,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
