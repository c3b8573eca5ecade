//! E-wallet accounts receiving invoice payments.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::EngineError;

/// An e-wallet owned by a profile (GoPay, OVO, PayPal, ...).
///
/// Same primary/archived semantics as `BankAccount`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EWallet {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub provider: String,
    pub account_name: String,
    pub phone_number: String,
    pub is_primary: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl EWallet {
    pub fn new(
        profile_id: Uuid,
        provider: String,
        account_name: String,
        phone_number: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            provider,
            account_name,
            phone_number,
            is_primary: false,
            archived: false,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "e_wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub provider: String,
    pub account_name: String,
    pub phone_number: String,
    pub is_primary: bool,
    pub archived: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profiles::Entity",
        from = "Column::ProfileId",
        to = "super::profiles::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Profiles,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&EWallet> for ActiveModel {
    fn from(wallet: &EWallet) -> Self {
        Self {
            id: ActiveValue::Set(wallet.id.to_string()),
            profile_id: ActiveValue::Set(wallet.profile_id.to_string()),
            provider: ActiveValue::Set(wallet.provider.clone()),
            account_name: ActiveValue::Set(wallet.account_name.clone()),
            phone_number: ActiveValue::Set(wallet.phone_number.clone()),
            is_primary: ActiveValue::Set(wallet.is_primary),
            archived: ActiveValue::Set(wallet.archived),
            created_at: ActiveValue::Set(wallet.created_at),
        }
    }
}

impl TryFrom<Model> for EWallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid e-wallet id".to_string()))?,
            profile_id: Uuid::parse_str(&model.profile_id)
                .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?,
            provider: model.provider,
            account_name: model.account_name,
            phone_number: model.phone_number,
            is_primary: model.is_primary,
            archived: model.archived,
            created_at: model.created_at,
        })
    }
}
