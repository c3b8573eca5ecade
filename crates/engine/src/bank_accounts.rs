//! Bank accounts receiving invoice payments.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::EngineError;

/// A bank account owned by a profile.
///
/// At most one non-archived bank account per profile is flagged `is_primary`;
/// the engine enforces that when setting the flag, not the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankAccount {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub is_primary: bool,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
}

impl BankAccount {
    pub fn new(
        profile_id: Uuid,
        bank_name: String,
        account_name: String,
        account_number: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            bank_name,
            account_name,
            account_number,
            is_primary: false,
            archived: false,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "bank_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub profile_id: String,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
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

impl From<&BankAccount> for ActiveModel {
    fn from(account: &BankAccount) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            profile_id: ActiveValue::Set(account.profile_id.to_string()),
            bank_name: ActiveValue::Set(account.bank_name.clone()),
            account_name: ActiveValue::Set(account.account_name.clone()),
            account_number: ActiveValue::Set(account.account_number.clone()),
            is_primary: ActiveValue::Set(account.is_primary),
            archived: ActiveValue::Set(account.archived),
            created_at: ActiveValue::Set(account.created_at),
        }
    }
}

impl TryFrom<Model> for BankAccount {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid bank account id".to_string()))?,
            profile_id: Uuid::parse_str(&model.profile_id)
                .map_err(|_| EngineError::InvalidId("invalid profile id".to_string()))?,
            bank_name: model.bank_name,
            account_name: model.account_name,
            account_number: model.account_number,
            is_primary: model.is_primary,
            archived: model.archived,
            created_at: model.created_at,
        })
    }
}
