use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    Currency, EngineError, ResultEngine, bank_accounts, clients, e_wallets, invoices, products,
    profiles, recurring_invoices, users,
};

use super::Engine;

/// Generates a `require_*` lookup for an entity owned by a user via a
/// `user_id` column and soft-deleted via `deleted_at`.
macro_rules! impl_owned_by_user {
    ($require_fn:ident, $module:ident, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            user_id: &str,
            target_id: Uuid,
        ) -> ResultEngine<$module::Model> {
            $module::Entity::find_by_id(target_id.to_string())
                .filter($module::Column::UserId.eq(user_id.to_string()))
                .filter($module::Column::DeletedAt.is_null())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_owned_by_user!(require_client_of_user, clients, "client not exists");
    impl_owned_by_user!(require_product_of_user, products, "product not exists");
    impl_owned_by_user!(require_invoice_of_user, invoices, "invoice not exists");
    impl_owned_by_user!(
        require_recurring_of_user,
        recurring_invoices,
        "recurring invoice not exists"
    );

    /// Looks up a live (non-deleted) user.
    pub(super) async fn require_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id.to_string())
            .filter(users::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))
    }

    /// Looks up the billing profile of a user. Most invoice operations need
    /// it for the account currency.
    pub(super) async fn require_profile(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<profiles::Model> {
        profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id.to_string()))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("profile not exists".to_string()))
    }

    pub(super) async fn find_profile(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<Option<profiles::Model>> {
        profiles::Entity::find()
            .filter(profiles::Column::UserId.eq(user_id.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// Looks up a non-archived bank account owned (via the profile) by the
    /// user.
    pub(super) async fn require_bank_account_of_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<bank_accounts::Model> {
        let profile = self.require_profile(db, user_id).await?;
        bank_accounts::Entity::find_by_id(account_id.to_string())
            .filter(bank_accounts::Column::ProfileId.eq(profile.id))
            .filter(bank_accounts::Column::Archived.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("bank account not exists".to_string()))
    }

    /// Looks up a non-archived e-wallet owned (via the profile) by the user.
    pub(super) async fn require_e_wallet_of_user(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        wallet_id: Uuid,
    ) -> ResultEngine<e_wallets::Model> {
        let profile = self.require_profile(db, user_id).await?;
        e_wallets::Entity::find_by_id(wallet_id.to_string())
            .filter(e_wallets::Column::ProfileId.eq(profile.id))
            .filter(e_wallets::Column::Archived.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("e-wallet not exists".to_string()))
    }
}

/// Parses the currency stored on a profile row.
pub(super) fn parse_account_currency(raw: &str) -> ResultEngine<Currency> {
    Currency::try_from(raw)
}
